// src/db/audit_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    /// Grava na mesma transação da operação auditada.
    pub async fn record<'e, E>(
        &self,
        executor: E,
        actor_user_id: Option<Uuid>,
        actor_company_id: Uuid,
        action: &str,
        details: Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_user_id, actor_company_id, action, details)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(actor_user_id)
        .bind(actor_company_id)
        .bind(action)
        .bind(details)
        .execute(executor)
        .await?;

        Ok(())
    }
}
