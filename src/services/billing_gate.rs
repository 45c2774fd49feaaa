// src/services/billing_gate.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BillingRepository, InvoiceSettingsRepository},
};

pub const BASE_PROFILE_MISSING: &str = "BASE billing profile incomplete";
pub const BASE_SETTINGS_MISSING: &str = "BASE numbering settings missing";
pub const COUNTERPARTY_PROFILE_MISSING: &str = "Counterparty billing profile incomplete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(&'static str),
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// Motivo da recusa; vazio quando pronto.
    pub fn reason(self) -> &'static str {
        match self {
            Readiness::Ready => "",
            Readiness::NotReady(reason) => reason,
        }
    }
}

/// Ordem fixa, primeira falha vence.
pub fn evaluate(base_has_profile: bool, base_has_settings: bool, counterparty_has_profile: bool) -> Readiness {
    if !base_has_profile {
        Readiness::NotReady(BASE_PROFILE_MISSING)
    } else if !base_has_settings {
        Readiness::NotReady(BASE_SETTINGS_MISSING)
    } else if !counterparty_has_profile {
        Readiness::NotReady(COUNTERPARTY_PROFILE_MISSING)
    } else {
        Readiness::Ready
    }
}

/// Só leitura, sem locks. Roda antes da reserva de número.
#[derive(Clone, Default)]
pub struct BillingGate {
    billing_repo: BillingRepository,
    settings_repo: InvoiceSettingsRepository,
}

impl BillingGate {
    pub fn new(billing_repo: BillingRepository, settings_repo: InvoiceSettingsRepository) -> Self {
        Self { billing_repo, settings_repo }
    }

    pub async fn is_ready(
        &self,
        conn: &mut PgConnection,
        base_company_id: Uuid,
        counterparty_company_id: Uuid,
    ) -> Result<Readiness, AppError> {
        if !self.billing_repo.has_profile(&mut *conn, base_company_id).await? {
            return Ok(evaluate(false, false, false));
        }
        if !self.settings_repo.exists(&mut *conn, base_company_id).await? {
            return Ok(evaluate(true, false, false));
        }
        let counterparty = self.billing_repo.has_profile(&mut *conn, counterparty_company_id).await?;

        Ok(evaluate(true, true, counterparty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_run_in_order() {
        assert_eq!(evaluate(false, false, false).reason(), BASE_PROFILE_MISSING);
        assert_eq!(evaluate(false, true, true).reason(), BASE_PROFILE_MISSING);
        assert_eq!(evaluate(true, false, false).reason(), BASE_SETTINGS_MISSING);
        assert_eq!(evaluate(true, true, false).reason(), COUNTERPARTY_PROFILE_MISSING);
    }

    #[test]
    fn ready_has_empty_reason() {
        let r = evaluate(true, true, true);
        assert!(r.is_ready());
        assert_eq!(r.reason(), "");
    }
}
