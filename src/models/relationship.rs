// src/models/relationship.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "partner_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerType {
    Producer,
    Collector,
    Recycler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "relationship_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    Pending,
    Active,
    Rejected,
}

// Liga uma empresa BASE a um parceiro de um determinado tipo
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub relationship_id: Uuid,
    pub base_company_id: Uuid,
    pub partner_company_id: Uuid,
    pub partner_type: PartnerType,
    pub status: RelationshipStatus,
    pub created_at: DateTime<Utc>,
}
