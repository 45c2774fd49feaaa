pub mod batches;
pub mod billing;
pub mod invoices;
pub mod rates;
