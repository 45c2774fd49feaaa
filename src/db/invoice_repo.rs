// src/db/invoice_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::invoice::{Invoice, InvoiceLineItem, NewInvoice, DEFAULT_CURRENCY},
    services::pricing::PricedLine,
};

#[derive(Clone, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  ESCRITA (transação do Invoice Writer)
    // =========================================================================

    pub async fn insert_header<'e, E>(&self, executor: E, new: &NewInvoice) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                base_company_id, counterparty_company_id, source_batch_id, invoice_number,
                issue_date, due_date, currency, vat_rate, subtotal, vat_amount, total, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'ISSUED')
            RETURNING *
            "#,
        )
        .bind(new.base_company_id)
        .bind(new.counterparty_company_id)
        .bind(new.source_batch_id)
        .bind(&new.invoice_number)
        .bind(new.issue_date)
        .bind(new.due_date)
        .bind(DEFAULT_CURRENCY)
        .bind(new.vat_rate)
        .bind(new.subtotal)
        .bind(new.vat_amount)
        .bind(new.total)
        .fetch_one(executor)
        .await;

        result.map_err(|e| {
            let constraint = e
                .as_database_error()
                .and_then(|db| db.constraint())
                .map(str::to_owned);
            match constraint.as_deref() {
                Some("uq_invoice_number") => AppError::DuplicateInvoiceNumber(new.invoice_number.clone()),
                Some("invoices_source_batch_id_key") => {
                    AppError::BatchStateConflict("batch already has an invoice".into())
                }
                _ => e.into(),
            }
        })
    }

    /// Insere todas as linhas numa única query (line_no contíguo a partir de 1).
    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        lines: &[PricedLine],
    ) -> Result<Vec<InvoiceLineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line_nos: Vec<i32> = (1..=lines.len() as i32).collect();
        let keys: Vec<String> = lines.iter().map(|l| l.key.clone()).collect();
        let descriptions: Vec<String> = lines.iter().map(|l| l.description.clone()).collect();
        let quantities: Vec<Decimal> = lines.iter().map(|l| l.quantity).collect();
        let units: Vec<String> = lines.iter().map(|l| l.unit.as_str().to_string()).collect();
        let unit_prices: Vec<Decimal> = lines.iter().map(|l| l.unit_price).collect();
        let totals: Vec<Decimal> = lines.iter().map(|l| l.line_total).collect();
        let weights: Vec<Decimal> = lines.iter().map(|l| l.weight_kg).collect();

        let mut items = sqlx::query_as::<_, InvoiceLineItem>(
            r#"
            INSERT INTO invoice_items (
                invoice_id, line_no, category_key, description, quantity, unit, unit_price, line_total, weight_kg
            )
            SELECT $1::uuid, * FROM UNNEST(
                $2::int4[], $3::text[], $4::text[], $5::numeric[], $6::text[], $7::numeric[], $8::numeric[], $9::numeric[]
            )
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(line_nos)
        .bind(keys)
        .bind(descriptions)
        .bind(quantities)
        .bind(units)
        .bind(unit_prices)
        .bind(totals)
        .bind(weights)
        .fetch_all(executor)
        .await?;

        items.sort_by_key(|i| i.line_no);
        Ok(items)
    }

    pub async fn attach_pdf_path<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
        pdf_path: &str,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            "UPDATE invoices SET pdf_path = $2 WHERE invoice_id = $1 RETURNING *",
        )
        .bind(invoice_id)
        .bind(pdf_path)
        .fetch_optional(executor)
        .await?;

        Ok(invoice)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_optional(executor)
            .await?;

        Ok(invoice)
    }

    pub async fn find_by_batch<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE source_batch_id = $1")
            .bind(batch_id)
            .fetch_optional(executor)
            .await?;

        Ok(invoice)
    }

    /// Faturas emitidas pela empresa ou contra ela.
    pub async fn list_for_company<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE base_company_id = $1 OR counterparty_company_id = $1
            ORDER BY issue_date DESC, invoice_number DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(invoices)
    }

    pub async fn items_for<'e, E>(&self, executor: E, invoice_ids: &[Uuid]) -> Result<Vec<InvoiceLineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, InvoiceLineItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ANY($1) ORDER BY invoice_id, line_no",
        )
        .bind(invoice_ids)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }
}
