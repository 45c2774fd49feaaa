// src/models/audit.rs

// Nomes das ações gravadas em audit_logs
pub const BATCH_CREATED: &str = "BATCH_CREATED";
pub const INVOICE_CREATED: &str = "INVOICE_CREATED";
pub const BILLING_PROFILE_UPDATED: &str = "BILLING_PROFILE_UPDATED";
pub const INVOICE_SETTINGS_UPDATED: &str = "INVOICE_SETTINGS_UPDATED";
