// src/services/sequencer.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InvoiceSettingsRepository,
    models::billing::{InvoiceSettings, UpdateInvoiceSettingsRequest},
};

/// "INV-2025-000001" com reset anual, "INV-000001" sem.
pub fn format_invoice_number(series_code: &str, year: i32, number: i32, year_reset: bool) -> String {
    if year_reset {
        format!("{}-{}-{:06}", series_code, year, number)
    } else {
        format!("{}-{:06}", series_code, number)
    }
}

/// Número reservado + os valores lidos antes do incremento (prazo, IVA).
#[derive(Debug, Clone)]
pub struct Reservation {
    pub invoice_number: String,
    pub settings: InvoiceSettings,
}

#[derive(Clone, Default)]
pub struct NumberingSequencer {
    repo: InvoiceSettingsRepository,
}

impl NumberingSequencer {
    pub fn new(repo: InvoiceSettingsRepository) -> Self {
        Self { repo }
    }

    /// Deve rodar dentro da transação do chamador: o lock vale até o commit/rollback.
    pub async fn reserve_next(
        &self,
        conn: &mut PgConnection,
        base_company_id: Uuid,
        year: i32,
    ) -> Result<Reservation, AppError> {
        // 1. Garante a linha e trava
        let settings = self.lock_or_create(conn, base_company_id).await?;

        // 2. Formata com o valor atual
        let invoice_number = format_invoice_number(
            &settings.series_code,
            year,
            settings.next_number,
            settings.year_reset,
        );

        // 3. Incrementa exatamente 1
        self.repo.increment(&mut *conn, base_company_id).await?;

        Ok(Reservation { invoice_number, settings })
    }

    pub async fn get_or_create(&self, conn: &mut PgConnection, base_company_id: Uuid) -> Result<InvoiceSettings, AppError> {
        self.repo.ensure_default(&mut *conn, base_company_id).await?;
        self.repo
            .find(&mut *conn, base_company_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("invoice settings row vanished for {}", base_company_id).into())
    }

    /// Edição manual. `next_number` nunca pode descer; a checagem é feita com a linha travada.
    pub async fn update_settings(
        &self,
        conn: &mut PgConnection,
        base_company_id: Uuid,
        input: &UpdateInvoiceSettingsRequest,
    ) -> Result<InvoiceSettings, AppError> {
        let current = self.lock_or_create(conn, base_company_id).await?;

        if let Some(requested) = input.next_number {
            if requested < current.next_number {
                return Err(AppError::SequenceDecrease { requested, current: current.next_number });
            }
        }

        self.repo.update(&mut *conn, base_company_id, input).await
    }

    async fn lock_or_create(&self, conn: &mut PgConnection, base_company_id: Uuid) -> Result<InvoiceSettings, AppError> {
        self.repo.ensure_default(&mut *conn, base_company_id).await?;
        self.repo
            .lock(&mut *conn, base_company_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("invoice settings row vanished for {}", base_company_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_with_year_reset() {
        assert_eq!(format_invoice_number("INV", 2025, 1, true), "INV-2025-000001");
        assert_eq!(format_invoice_number("RB", 2026, 4213, true), "RB-2026-004213");
    }

    #[test]
    fn number_without_year_reset() {
        assert_eq!(format_invoice_number("INV", 2025, 17, false), "INV-000017");
    }

    #[test]
    fn numbers_past_six_digits_are_not_truncated() {
        assert_eq!(format_invoice_number("INV", 2025, 1_234_567, false), "INV-1234567");
    }
}
