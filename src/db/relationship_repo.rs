// src/db/relationship_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::relationship::{PartnerType, Relationship},
};

#[derive(Clone, Default)]
pub struct RelationshipRepository;

impl RelationshipRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        base_company_id: Uuid,
        partner_company_id: Uuid,
        partner_type: PartnerType,
    ) -> Result<Option<Relationship>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rel = sqlx::query_as::<_, Relationship>(
            r#"
            SELECT * FROM relationships
            WHERE base_company_id = $1 AND partner_company_id = $2 AND partner_type = $3
            "#,
        )
        .bind(base_company_id)
        .bind(partner_company_id)
        .bind(partner_type)
        .fetch_optional(executor)
        .await?;

        Ok(rel)
    }
}
