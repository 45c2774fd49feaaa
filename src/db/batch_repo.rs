// src/db/batch_repo.rs

use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::batch::{Batch, BatchFilter, BatchKind, BatteryLines, LockedBatch},
};

#[derive(Clone, Default)]
pub struct BatchRepository;

impl BatchRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        kind: BatchKind,
        company_id: Uuid,
        base_company_id: Uuid,
        lines: &BatteryLines,
        total_weight: Decimal,
        total_cost: Decimal,
    ) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (kind, company_id, base_company_id, status, batteries, total_weight, total_cost)
            VALUES ($1, $2, $3, 'PENDING', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(kind)
        .bind(company_id)
        .bind(base_company_id)
        .bind(Json(lines))
        .bind(total_weight)
        .bind(total_cost)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, batch_id: Uuid) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE batch_id = $1")
            .bind(batch_id)
            .fetch_optional(executor)
            .await?;

        Ok(batch)
    }

    /// Lotes visíveis para a empresa: os endereçados a ela (BASE) e os que ela submeteu.
    pub async fn list_for_company<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        filter: &BatchFilter,
    ) -> Result<Vec<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches
            WHERE (base_company_id = $1 OR company_id = $1)
              AND ($2::batch_kind IS NULL OR kind = $2)
              AND ($3::batch_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.kind)
        .bind(filter.status)
        .fetch_all(executor)
        .await?;

        Ok(batches)
    }

    // =========================================================================
    //  VALIDAÇÃO (sempre dentro da transação do Invoice Writer)
    // =========================================================================

    /// Trava a linha do lote e traz o status da relação que o governa
    /// (parceiro = quem submeteu, tipo derivado do `kind`).
    pub async fn lock_with_relationship<'e, E>(
        &self,
        executor: E,
        batch_id: Uuid,
    ) -> Result<Option<LockedBatch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locked = sqlx::query_as::<_, LockedBatch>(
            r#"
            SELECT b.*, r.status AS relationship_status
            FROM batches b
            LEFT JOIN relationships r
                   ON r.base_company_id = b.base_company_id
                  AND r.partner_company_id = b.company_id
                  AND r.partner_type = (CASE b.kind
                        WHEN 'COLLECTION' THEN 'COLLECTOR'
                        WHEN 'PACKAGE' THEN 'PRODUCER'
                        ELSE 'RECYCLER'
                      END)::partner_type
            WHERE b.batch_id = $1
            FOR UPDATE OF b
            "#,
        )
        .bind(batch_id)
        .fetch_optional(executor)
        .await?;

        Ok(locked)
    }

    /// PENDING -> VALIDATED. Só altera lotes ainda pendentes; `None` indica que
    /// outro escritor já mudou o estado.
    pub async fn mark_validated<'e, E>(
        &self,
        executor: E,
        batch_id: Uuid,
        invoice_id: Uuid,
        total_weight: Decimal,
        total_cost: Decimal,
    ) -> Result<Option<Batch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE batches
            SET status = 'VALIDATED',
                invoice_id = $2,
                total_weight = $3,
                total_cost = $4,
                validated_at = NOW()
            WHERE batch_id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(batch_id)
        .bind(invoice_id)
        .bind(total_weight)
        .bind(total_cost)
        .fetch_optional(executor)
        .await?;

        Ok(batch)
    }
}
