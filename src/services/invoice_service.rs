// src/services/invoice_service.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_with_lock_timeout, error::AppError},
    db::{AuditRepository, BatchRepository, BillingRepository, InvoiceRepository, InvoiceSettingsRepository},
    models::{
        audit,
        batch::BatchStatus,
        invoice::{Invoice, InvoiceDetail, NewInvoice, ValidationOutcome},
        relationship::RelationshipStatus,
    },
    services::{
        billing_gate::BillingGate,
        document_store::DocumentStore,
        pdf::{render_with_fallback, InvoiceDocument, InvoiceRenderer},
        pricing::{compute_totals, ensure_storable, normalize_stored, price_lines},
        rates::RateTable,
        sequencer::NumberingSequencer,
    },
};

/// Colaboradores externos do emissor de faturas.
#[derive(Clone)]
pub struct InvoiceCollaborators {
    pub rates: Arc<RateTable>,
    pub renderer: Arc<dyn InvoiceRenderer>,
    pub store: Arc<dyn DocumentStore>,
    pub lock_timeout: Duration,
}

#[derive(Clone)]
pub struct InvoiceService {
    pool: PgPool,
    batch_repo: BatchRepository,
    invoice_repo: InvoiceRepository,
    billing_repo: BillingRepository,
    audit_repo: AuditRepository,
    gate: BillingGate,
    sequencer: NumberingSequencer,
    rates: Arc<RateTable>,
    renderer: Arc<dyn InvoiceRenderer>,
    store: Arc<dyn DocumentStore>,
    lock_timeout: Duration,
}

impl InvoiceService {
    pub fn new(pool: PgPool, collaborators: InvoiceCollaborators) -> Self {
        Self {
            batch_repo: BatchRepository::new(),
            invoice_repo: InvoiceRepository::new(),
            billing_repo: BillingRepository::new(),
            audit_repo: AuditRepository::new(),
            gate: BillingGate::new(BillingRepository::new(), InvoiceSettingsRepository::new()),
            sequencer: NumberingSequencer::new(InvoiceSettingsRepository::new()),
            rates: collaborators.rates,
            renderer: collaborators.renderer,
            store: collaborators.store,
            lock_timeout: collaborators.lock_timeout,
            pool,
        }
    }

    pub async fn validate_batch(
        &self,
        batch_id: Uuid,
        acting_company_id: Uuid,
        actor_user_id: Option<Uuid>,
    ) -> Result<ValidationOutcome, AppError> {
        let today = Utc::now().date_naive();
        self.validate_batch_on(batch_id, acting_company_id, actor_user_id, today).await
    }

    /// PENDING -> VALIDATED numa única transação. Qualquer erro antes do commit desfaz tudo,
    /// inclusive o incremento da numeração.
    pub async fn validate_batch_on(
        &self,
        batch_id: Uuid,
        acting_company_id: Uuid,
        actor_user_id: Option<Uuid>,
        issue_date: NaiveDate,
    ) -> Result<ValidationOutcome, AppError> {
        let mut tx = begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;

        // 1. Trava o lote + relação
        let locked = self
            .batch_repo
            .lock_with_relationship(&mut *tx, batch_id)
            .await?
            .ok_or(AppError::BatchNotFound)?;
        let batch = locked.batch;

        if batch.base_company_id != acting_company_id {
            return Err(AppError::Forbidden(
                "acting company is not the BASE company of this batch".into(),
            ));
        }
        match locked.relationship_status {
            None => return Err(AppError::RelationshipNotFound),
            Some(RelationshipStatus::Active) => {}
            Some(_) => return Err(AppError::RelationshipNotActive),
        }

        // 2. Já validado: devolve a fatura existente, sem escrever nada
        if batch.status == BatchStatus::Validated {
            let invoice = self
                .invoice_repo
                .find_by_batch(&mut *tx, batch.batch_id)
                .await?
                .ok_or_else(|| AppError::BatchStateConflict("batch is VALIDATED but has no invoice".into()))?;
            let items = self.invoice_repo.items_for(&mut *tx, &[invoice.invoice_id]).await?;
            tx.commit().await?;

            tracing::info!(
                "↩️ Lote {} já validado, devolvendo fatura {}",
                batch.batch_id,
                invoice.invoice_number
            );
            return Ok(ValidationOutcome {
                batch,
                invoice: InvoiceDetail { invoice, items },
                already_validated: true,
            });
        }

        // 3. Gate (antes de qualquer número ser reservado)
        let readiness = self
            .gate
            .is_ready(&mut *tx, acting_company_id, batch.company_id)
            .await?;
        if !readiness.is_ready() {
            tracing::warn!(
                "⛔ Lote {} não pode ser faturado: {}",
                batch.batch_id,
                readiness.reason()
            );
            return Err(AppError::BillingNotReady(readiness.reason().to_string()));
        }

        // 4. Recalcula a partir das linhas gravadas
        let lines = normalize_stored(&batch.batteries)?;
        if lines.is_empty() {
            return Err(AppError::EmptyBatch);
        }
        let priced = price_lines(&self.rates, &lines);

        // 5. Reserva o número (único ponto que mexe no contador)
        let reservation = self
            .sequencer
            .reserve_next(&mut *tx, acting_company_id, issue_date.year())
            .await?;
        let settings = &reservation.settings;
        let totals = compute_totals(&priced, settings.default_vat_rate);
        ensure_storable(&priced, &totals)?;

        // 6. Datas
        let due_days = u64::try_from(settings.due_days).unwrap_or(0);
        let due_date = issue_date
            .checked_add_days(Days::new(due_days))
            .ok_or_else(|| anyhow::anyhow!("due date out of range ({} + {} days)", issue_date, due_days))?;

        // 7. Cabeçalho + linhas
        let new_invoice = NewInvoice {
            base_company_id: acting_company_id,
            counterparty_company_id: batch.company_id,
            source_batch_id: batch.batch_id,
            invoice_number: reservation.invoice_number.clone(),
            issue_date,
            due_date,
            vat_rate: settings.default_vat_rate,
            subtotal: totals.subtotal,
            vat_amount: totals.vat_amount,
            total: totals.total,
        };
        let invoice = self.invoice_repo.insert_header(&mut *tx, &new_invoice).await?;
        let items = self
            .invoice_repo
            .insert_items(&mut *tx, invoice.invoice_id, &priced)
            .await?;

        // 8. PDF (falha de renderização nunca aborta a emissão)
        let issuer = self
            .billing_repo
            .party_snapshot(&mut *tx, acting_company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)?;
        let counterparty = self
            .billing_repo
            .party_snapshot(&mut *tx, batch.company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)?;
        let pdf = render_with_fallback(
            self.renderer.clone(),
            InvoiceDocument {
                invoice: invoice.clone(),
                items: items.clone(),
                issuer,
                counterparty,
            },
        )
        .await?;

        // 9. Documento gravado + caminho na fatura (falha aqui aborta tudo)
        let pdf_path = self
            .store
            .write(&format!("{}.pdf", invoice.invoice_id), &pdf)
            .await?;
        let invoice = self
            .invoice_repo
            .attach_pdf_path(&mut *tx, invoice.invoice_id, &pdf_path)
            .await?
            .ok_or_else(|| anyhow::anyhow!("invoice {} vanished before pdf_path was set", invoice.invoice_id))?;
        tracing::debug!("📄 PDF da fatura {} gravado em {}", invoice.invoice_number, pdf_path);

        // 10. PENDING -> VALIDATED
        let batch = self
            .batch_repo
            .mark_validated(
                &mut *tx,
                batch.batch_id,
                invoice.invoice_id,
                totals.total_weight,
                totals.subtotal,
            )
            .await?
            .ok_or_else(|| AppError::BatchStateConflict("batch changed state during validation".into()))?;

        // 11. Auditoria
        self.audit_repo
            .record(
                &mut *tx,
                actor_user_id,
                acting_company_id,
                audit::INVOICE_CREATED,
                json!({
                    "batchId": batch.batch_id,
                    "batchKind": batch.kind.as_str(),
                    "invoiceId": invoice.invoice_id,
                    "invoiceNumber": invoice.invoice_number,
                }),
            )
            .await?;

        // 12. Commit
        tx.commit().await?;

        tracing::info!(
            "✅ Fatura {} emitida para o lote {} (subtotal {}, IVA {}, total {})",
            invoice.invoice_number,
            batch.batch_id,
            invoice.subtotal,
            invoice.vat_amount,
            invoice.total
        );

        Ok(ValidationOutcome {
            batch,
            invoice: InvoiceDetail { invoice, items },
            already_validated: false,
        })
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_invoices(&self, company_id: Uuid) -> Result<Vec<InvoiceDetail>, AppError> {
        let invoices = self.invoice_repo.list_for_company(&self.pool, company_id).await?;
        let ids: Vec<Uuid> = invoices.iter().map(|i| i.invoice_id).collect();
        let items = self.invoice_repo.items_for(&self.pool, &ids).await?;

        let mut by_invoice: HashMap<Uuid, Vec<_>> = HashMap::new();
        for item in items {
            by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let items = by_invoice.remove(&invoice.invoice_id).unwrap_or_default();
                InvoiceDetail { invoice, items }
            })
            .collect())
    }

    pub async fn get_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let invoice = self.find_visible(company_id, invoice_id).await?;
        let items = self.invoice_repo.items_for(&self.pool, &[invoice.invoice_id]).await?;

        Ok(InvoiceDetail { invoice, items })
    }

    /// Bytes do PDF + número da fatura (para o nome do arquivo no download).
    pub async fn invoice_pdf(&self, company_id: Uuid, invoice_id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let invoice = self.find_visible(company_id, invoice_id).await?;
        let path = invoice.pdf_path.as_deref().ok_or(AppError::DocumentNotFound)?;
        let bytes = self.store.read(path).await?;

        Ok((invoice.invoice_number, bytes))
    }

    // Emissor e contraparte enxergam a fatura; os demais recebem NotFound
    async fn find_visible(&self, company_id: Uuid, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.invoice_repo
            .find_by_id(&self.pool, invoice_id)
            .await?
            .filter(|i| i.base_company_id == company_id || i.counterparty_company_id == company_id)
            .ok_or(AppError::InvoiceNotFound)
    }
}
