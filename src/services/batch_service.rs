// src/services/batch_service.rs

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, BatchRepository, CompanyRepository, RelationshipRepository},
    models::{
        audit,
        batch::{Batch, BatchDetail, BatchFilter, CreateBatchPayload},
        company::CompanyRole,
        relationship::RelationshipStatus,
    },
    services::{
        pricing::{compute_totals, ensure_storable, normalize_lines, normalize_stored, price_lines, summarize},
        rates::RateTable,
    },
};

#[derive(Clone)]
pub struct BatchService {
    pool: PgPool,
    repo: BatchRepository,
    relationship_repo: RelationshipRepository,
    company_repo: CompanyRepository,
    audit_repo: AuditRepository,
    rates: Arc<RateTable>,
}

impl BatchService {
    pub fn new(pool: PgPool, rates: Arc<RateTable>) -> Self {
        Self {
            repo: BatchRepository::new(),
            relationship_repo: RelationshipRepository::new(),
            company_repo: CompanyRepository::new(),
            audit_repo: AuditRepository::new(),
            pool,
            rates,
        }
    }

    /// Submissão de um lote por um parceiro. Os totais são sempre calculados aqui.
    pub async fn create_batch(
        &self,
        company_id: Uuid,
        actor_user_id: Option<Uuid>,
        payload: CreateBatchPayload,
    ) -> Result<BatchDetail, AppError> {
        // 1. Normaliza antes de abrir a transação
        let lines = normalize_lines(&payload.batteries)?;
        if lines.is_empty() {
            return Err(AppError::EmptyBatch);
        }

        let mut tx = self.pool.begin().await?;

        // 2. Destino tem que ser uma BASE
        let base = self
            .company_repo
            .find_by_id(&mut *tx, payload.base_company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)?;
        if base.role != CompanyRole::Base {
            return Err(AppError::Forbidden("target company is not a BASE company".into()));
        }

        // 3. Relação do tipo certo, não rejeitada
        let rel = self
            .relationship_repo
            .find(&mut *tx, base.company_id, company_id, payload.kind.partner_type())
            .await?
            .ok_or(AppError::RelationshipNotFound)?;
        if rel.status == RelationshipStatus::Rejected {
            return Err(AppError::RelationshipNotActive);
        }

        // 4. Totais para exibição (sem IVA)
        let priced = price_lines(&self.rates, &lines);
        let totals = compute_totals(&priced, rust_decimal::Decimal::ZERO);
        ensure_storable(&priced, &totals)?;

        let batch = self
            .repo
            .create(
                &mut *tx,
                payload.kind,
                company_id,
                base.company_id,
                &lines,
                totals.total_weight,
                totals.subtotal,
            )
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                actor_user_id,
                company_id,
                audit::BATCH_CREATED,
                json!({
                    "batchId": batch.batch_id,
                    "kind": batch.kind.as_str(),
                    "baseCompanyId": batch.base_company_id,
                    "totalCost": totals.subtotal,
                }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "✅ Lote {} ({}) criado por {} para {}",
            batch.batch_id,
            batch.kind.as_str(),
            company_id,
            batch.base_company_id
        );

        Ok(BatchDetail { batch, lines: summarize(&priced) })
    }

    pub async fn list_batches(&self, company_id: Uuid, filter: &BatchFilter) -> Result<Vec<Batch>, AppError> {
        self.repo.list_for_company(&self.pool, company_id, filter).await
    }

    /// Visível para a BASE destinatária e para quem submeteu; para os demais o lote "não existe".
    pub async fn get_batch(&self, company_id: Uuid, batch_id: Uuid) -> Result<BatchDetail, AppError> {
        let batch = self
            .repo
            .find_by_id(&self.pool, batch_id)
            .await?
            .filter(|b| b.base_company_id == company_id || b.company_id == company_id)
            .ok_or(AppError::BatchNotFound)?;

        let lines = normalize_stored(&batch.batteries)?;
        let priced = price_lines(&self.rates, &lines);

        Ok(BatchDetail { batch, lines: summarize(&priced) })
    }
}
