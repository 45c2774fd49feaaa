// src/models/batch.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::relationship::{PartnerType, RelationshipStatus};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "batch_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchKind {
    Collection, // COLLECTOR -> BASE
    Package,    // PRODUCER -> BASE
    Recycling,  // RECYCLER -> BASE
}

impl BatchKind {
    /// Tipo de parceiro que pode submeter este tipo de lote.
    pub fn partner_type(self) -> PartnerType {
        match self {
            BatchKind::Collection => PartnerType::Collector,
            BatchKind::Package => PartnerType::Producer,
            BatchKind::Recycling => PartnerType::Recycler,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchKind::Collection => "COLLECTION",
            BatchKind::Package => "PACKAGE",
            BatchKind::Recycling => "RECYCLING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "batch_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Validated, // terminal
}

// --- Linhas de bateria ---

// Casas decimais aceitas; as mesmas das colunas de quantidade e valor
const MAX_WEIGHT_SCALE: u32 = 3;
const MAX_PRICE_SCALE: u32 = 2;

/// Linha canônica de uma categoria. Lida do JSONB com validação (aceita o formato antigo,
/// um número solto = quantidade de peças).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBatteryEntry")]
pub struct BatteryLine {
    pub pieces: i64,
    pub weight_kg: Decimal,
    pub price_ron: Decimal,
}

impl BatteryLine {
    pub fn is_empty(&self) -> bool {
        self.pieces == 0 && self.weight_kg.is_zero() && self.price_ron.is_zero()
    }
}

pub type BatteryLines = BTreeMap<String, BatteryLine>;

/// O que o cliente pode mandar por categoria.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBatteryEntry {
    Count(Decimal),
    Line(RawBatteryLine),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBatteryLine {
    #[serde(default, alias = "pcs")]
    pub pieces: Option<Decimal>,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub price_ron: Option<Decimal>,
}

impl RawBatteryEntry {
    /// Converte para a linha canônica: campos ausentes viram zero, negativos são rejeitados.
    pub fn to_line(&self) -> Result<BatteryLine, String> {
        let (pieces, weight_kg, price_ron) = match self {
            RawBatteryEntry::Count(n) => (*n, Decimal::ZERO, Decimal::ZERO),
            RawBatteryEntry::Line(l) => (
                l.pieces.unwrap_or_default(),
                l.weight_kg.unwrap_or_default(),
                l.price_ron.unwrap_or_default(),
            ),
        };

        if pieces.is_sign_negative() && !pieces.is_zero() {
            return Err("pieces must be >= 0".into());
        }
        if !pieces.fract().is_zero() {
            return Err("pieces must be a whole number".into());
        }
        if weight_kg.is_sign_negative() && !weight_kg.is_zero() {
            return Err("weight_kg must be >= 0".into());
        }
        if price_ron.is_sign_negative() && !price_ron.is_zero() {
            return Err("price_ron must be >= 0".into());
        }

        if weight_kg.normalize().scale() > MAX_WEIGHT_SCALE {
            return Err("weight_kg allows at most 3 decimal places".into());
        }
        if price_ron.normalize().scale() > MAX_PRICE_SCALE {
            return Err("price_ron allows at most 2 decimal places".into());
        }

        let pieces = pieces.to_i64().ok_or_else(|| "pieces is out of range".to_string())?;

        Ok(BatteryLine { pieces, weight_kg, price_ron })
    }
}

impl TryFrom<RawBatteryEntry> for BatteryLine {
    type Error = String;

    fn try_from(raw: RawBatteryEntry) -> Result<Self, Self::Error> {
        raw.to_line()
    }
}

impl From<BatteryLine> for RawBatteryEntry {
    fn from(line: BatteryLine) -> Self {
        RawBatteryEntry::Line(RawBatteryLine {
            pieces: Some(Decimal::from(line.pieces)),
            weight_kg: Some(line.weight_kg),
            price_ron: Some(line.price_ron),
        })
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: Uuid,
    pub kind: BatchKind,

    // Empresa que submeteu (PRODUCER / COLLECTOR / RECYCLER)
    pub company_id: Uuid,
    pub base_company_id: Uuid,

    pub status: BatchStatus,
    pub batteries: Json<BatteryLines>,

    // Cache para exibição; a validação sempre recalcula
    pub total_weight: Decimal,
    pub total_cost: Decimal,

    pub invoice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Lote travado (FOR UPDATE) junto com o status da relação que o governa.
#[derive(Debug, Clone, FromRow)]
pub struct LockedBatch {
    #[sqlx(flatten)]
    pub batch: Batch,
    pub relationship_status: Option<RelationshipStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSummary {
    pub key: String,
    pub label: String,
    pub quantity_display: String,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub lines: Vec<LineSummary>,
}

// --- Payloads ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchPayload {
    pub kind: BatchKind,
    pub base_company_id: Uuid,
    pub batteries: BTreeMap<String, RawBatteryEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub kind: Option<BatchKind>,
    pub status: Option<BatchStatus>,
}
