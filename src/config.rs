// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::services::{
    document_store::FsDocumentStore,
    pdf::GenPdfRenderer,
    rates::RateTable,
    BatchService, BillingService, InvoiceCollaborators, InvoiceService,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub lock_timeout: Duration,
    pub invoice_storage_dir: PathBuf,
    pub pdf_fonts_dir: PathBuf,
    pub pdf_font_family: String,
    pub pricing_use_rate_table: bool,
}

impl AppConfig {
    /// Lê do ambiente (com suporte a `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            lock_timeout: Duration::from_millis(parse_or(&lookup, "LOCK_TIMEOUT_MS", 5000)?),
            invoice_storage_dir: lookup("INVOICE_STORAGE_DIR")
                .unwrap_or_else(|| "files/invoices".to_string())
                .into(),
            pdf_fonts_dir: lookup("PDF_FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()).into(),
            pdf_font_family: lookup("PDF_FONT_FAMILY").unwrap_or_else(|| "Roboto".to_string()),
            pricing_use_rate_table: parse_or(&lookup, "PRICING_USE_RATE_TABLE", true)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ({:?}): {}", key, raw, e)),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub rates: Arc<RateTable>,
    pub batch_service: BatchService,
    pub invoice_service: InvoiceService,
    pub billing_service: BillingService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre um pool já aberto.
    pub fn with_pool(db_pool: PgPool, config: AppConfig) -> Self {
        let rates = Arc::new(if config.pricing_use_rate_table {
            RateTable::standard()
        } else {
            RateTable::free_form()
        });

        let collaborators = InvoiceCollaborators {
            rates: rates.clone(),
            renderer: Arc::new(GenPdfRenderer::new(&config.pdf_fonts_dir, &config.pdf_font_family)),
            store: Arc::new(FsDocumentStore::new(&config.invoice_storage_dir)),
            lock_timeout: config.lock_timeout,
        };

        Self {
            batch_service: BatchService::new(db_pool.clone(), rates.clone()),
            invoice_service: InvoiceService::new(db_pool.clone(), collaborators),
            billing_service: BillingService::new(db_pool.clone(), config.lock_timeout),
            rates,
            config: Arc::new(config),
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/db")])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.db_max_connections, 5);
        assert_eq!(cfg.lock_timeout, Duration::from_millis(5000));
        assert!(cfg.pricing_use_rate_table);
        assert_eq!(cfg.invoice_storage_dir, PathBuf::from("files/invoices"));
    }

    #[test]
    fn database_url_is_required() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn invalid_numbers_are_startup_errors() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("LOCK_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LOCK_TIMEOUT_MS"));
    }

    #[test]
    fn rate_table_can_be_disabled() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("PRICING_USE_RATE_TABLE", "false"),
        ]))
        .unwrap();
        assert!(!cfg.pricing_use_rate_table);
    }
}
