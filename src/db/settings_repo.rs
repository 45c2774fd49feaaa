// src/db/settings_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{InvoiceSettings, UpdateInvoiceSettingsRequest},
};

/// Estado da numeração de faturas (uma linha por empresa BASE).
#[derive(Clone, Default)]
pub struct InvoiceSettingsRepository;

impl InvoiceSettingsRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find<'e, E>(&self, executor: E, base_company_id: Uuid) -> Result<Option<InvoiceSettings>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, InvoiceSettings>(
            "SELECT * FROM company_invoice_settings WHERE base_company_id = $1",
        )
        .bind(base_company_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings)
    }

    pub async fn exists<'e, E>(&self, executor: E, base_company_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM company_invoice_settings WHERE base_company_id = $1)",
        )
        .bind(base_company_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Cria a linha padrão (INV, 1, reset anual, 15 dias, 19%) se ainda não existir.
    pub async fn ensure_default<'e, E>(&self, executor: E, base_company_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO company_invoice_settings (base_company_id)
            VALUES ($1)
            ON CONFLICT (base_company_id) DO NOTHING
            "#,
        )
        .bind(base_company_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// SELECT ... FOR UPDATE: serializa a numeração por empresa BASE.
    pub async fn lock<'e, E>(&self, executor: E, base_company_id: Uuid) -> Result<Option<InvoiceSettings>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, InvoiceSettings>(
            "SELECT * FROM company_invoice_settings WHERE base_company_id = $1 FOR UPDATE",
        )
        .bind(base_company_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings)
    }

    pub async fn increment<'e, E>(&self, executor: E, base_company_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE company_invoice_settings
            SET next_number = next_number + 1, updated_at = NOW()
            WHERE base_company_id = $1
            "#,
        )
        .bind(base_company_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Atualização parcial; a regra de não diminuir `next_number` é checada antes, com a linha travada.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        base_company_id: Uuid,
        input: &UpdateInvoiceSettingsRequest,
    ) -> Result<InvoiceSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, InvoiceSettings>(
            r#"
            UPDATE company_invoice_settings SET
                series_code      = COALESCE($2, series_code),
                year_reset       = COALESCE($3, year_reset),
                due_days         = COALESCE($4, due_days),
                default_vat_rate = COALESCE($5, default_vat_rate),
                next_number      = COALESCE($6, next_number),
                updated_at       = NOW()
            WHERE base_company_id = $1
            RETURNING *
            "#,
        )
        .bind(base_company_id)
        .bind(input.series_code.as_deref())
        .bind(input.year_reset)
        .bind(input.due_days)
        .bind(input.default_vat_rate)
        .bind(input.next_number)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
