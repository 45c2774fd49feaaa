// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::batch::Batch;

pub const DEFAULT_CURRENCY: &str = "RON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Issued,
}

/// Unidade de medida da linha ("buc" = bucăți / peças).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Buc,
    Kg,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Buc => "buc",
            Unit::Kg => "kg",
        }
    }
}

// Documento fiscal: imutável depois de criado (exceto o pdf_path)
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub base_company_id: Uuid,
    pub counterparty_company_id: Uuid,
    pub source_batch_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub vat_rate: Decimal,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub item_id: Uuid,
    pub invoice_id: Uuid,
    pub line_no: i32,
    pub category_key: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub weight_kg: Decimal,
}

/// Dados para inserir o cabeçalho; os valores já vêm calculados.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub base_company_id: Uuid,
    pub counterparty_company_id: Uuid,
    pub source_batch_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub vat_rate: Decimal,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceLineItem>,
}

/// Resultado de `validate_batch`: o lote já VALIDATED e a fatura emitida para ele.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub batch: Batch,
    pub invoice: InvoiceDetail,
    // true quando o lote já estava validado e nada foi escrito
    pub already_validated: bool,
}
