// src/services/billing_service.rs

use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::begin_with_lock_timeout, error::AppError},
    db::{AuditRepository, BillingRepository, CompanyRepository, InvoiceSettingsRepository},
    models::{
        audit,
        billing::{BillingProfile, InvoiceSettings, UpdateBillingProfileRequest, UpdateInvoiceSettingsRequest},
        company::CompanyRole,
    },
    services::sequencer::NumberingSequencer,
};

#[derive(Clone)]
pub struct BillingService {
    pool: PgPool,
    billing_repo: BillingRepository,
    company_repo: CompanyRepository,
    audit_repo: AuditRepository,
    sequencer: NumberingSequencer,
    lock_timeout: Duration,
}

impl BillingService {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool,
            billing_repo: BillingRepository::new(),
            company_repo: CompanyRepository::new(),
            audit_repo: AuditRepository::new(),
            sequencer: NumberingSequencer::new(InvoiceSettingsRepository::new()),
            lock_timeout,
        }
    }

    // =========================================================================
    //  PERFIL DE FATURAÇÃO
    // =========================================================================

    pub async fn get_profile(&self, company_id: Uuid) -> Result<BillingProfile, AppError> {
        self.billing_repo
            .get_profile(&self.pool, company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)
    }

    pub async fn update_profile(
        &self,
        company_id: Uuid,
        actor_user_id: Option<Uuid>,
        payload: UpdateBillingProfileRequest,
    ) -> Result<BillingProfile, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        if !self.billing_repo.upsert_profile(&mut *tx, company_id, &payload).await? {
            return Err(AppError::CompanyNotFound);
        }

        self.audit_repo
            .record(
                &mut *tx,
                actor_user_id,
                company_id,
                audit::BILLING_PROFILE_UPDATED,
                json!({ "companyId": company_id }),
            )
            .await?;

        let profile = self
            .billing_repo
            .get_profile(&mut *tx, company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)?;

        tx.commit().await?;
        tracing::info!("✅ Perfil de faturação atualizado para {}", company_id);

        Ok(profile)
    }

    // =========================================================================
    //  NUMERAÇÃO (só BASE)
    // =========================================================================

    pub async fn get_settings(&self, company_id: Uuid) -> Result<InvoiceSettings, AppError> {
        let mut tx = self.pool.begin().await?;
        self.require_base(&mut *tx, company_id).await?;
        let settings = self.sequencer.get_or_create(&mut *tx, company_id).await?;
        tx.commit().await?;

        Ok(settings)
    }

    pub async fn update_settings(
        &self,
        company_id: Uuid,
        actor_user_id: Option<Uuid>,
        payload: UpdateInvoiceSettingsRequest,
    ) -> Result<InvoiceSettings, AppError> {
        payload.validate()?;

        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;
        self.require_base(&mut *tx, company_id).await?;

        let settings = self.sequencer.update_settings(&mut *tx, company_id, &payload).await?;

        self.audit_repo
            .record(
                &mut *tx,
                actor_user_id,
                company_id,
                audit::INVOICE_SETTINGS_UPDATED,
                json!({
                    "seriesCode": settings.series_code,
                    "nextNumber": settings.next_number,
                    "yearReset": settings.year_reset,
                    "dueDays": settings.due_days,
                    "defaultVatRate": settings.default_vat_rate,
                }),
            )
            .await?;

        tx.commit().await?;
        tracing::info!("✅ Numeração de {} atualizada (próximo: {})", company_id, settings.next_number);

        Ok(settings)
    }

    async fn require_base(
        &self,
        conn: &mut sqlx::PgConnection,
        company_id: Uuid,
    ) -> Result<(), AppError> {
        let company = self
            .company_repo
            .find_by_id(conn, company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)?;
        if company.role != CompanyRole::Base {
            return Err(AppError::Forbidden("only BASE companies have invoice settings".into()));
        }
        Ok(())
    }
}
