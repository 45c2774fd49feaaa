pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod batch_repo;
pub use batch_repo::BatchRepository;
pub mod billing_repo;
pub use billing_repo::BillingRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod relationship_repo;
pub use relationship_repo::RelationshipRepository;
pub mod settings_repo;
pub use settings_repo::InvoiceSettingsRepository;

// Migrações embutidas no binário (diretório `migrations/`)
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
