pub mod rates;
pub mod pricing;
pub mod billing_gate;
pub mod sequencer;
pub mod pdf;
pub mod document_store;

pub mod batch_service;
pub use batch_service::BatchService;
pub mod billing_service;
pub use billing_service::BillingService;
pub mod invoice_service;
pub use invoice_service::{InvoiceCollaborators, InvoiceService};
