// src/db/billing_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{BillingProfile, PartySnapshot, UpdateBillingProfileRequest},
};

#[derive(Clone, Default)]
pub struct BillingRepository;

impl BillingRepository {
    pub fn new() -> Self {
        Self
    }

    /// Empresa + perfil. Sem perfil gravado, nome e CUI vêm da própria empresa.
    pub async fn get_profile<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Option<BillingProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, BillingProfile>(
            r#"
            SELECT
                c.company_id,
                COALESCE(p.legal_name, c.name)  AS legal_name,
                COALESCE(p.cui, c.cui)          AS cui,
                p.reg_com, p.address_line, p.city, p.county, p.postal_code,
                COALESCE(p.country, 'RO')       AS country,
                p.bank_name, p.iban, p.email_billing, p.phone_billing, p.vat_payer,
                COALESCE(p.source, 'COMPANY')   AS source,
                (p.company_id IS NOT NULL)      AS has_profile,
                p.updated_at
            FROM companies c
            LEFT JOIN company_billing_profiles p ON p.company_id = c.company_id
            WHERE c.company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    /// UPSERT com semântica de merge: campo ausente no payload mantém o valor gravado.
    /// Retorna `false` se a empresa não existe.
    pub async fn upsert_profile<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &UpdateBillingProfileRequest,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO company_billing_profiles (
                company_id, legal_name, cui, reg_com, address_line, city, county, postal_code,
                country, bank_name, iban, email_billing, phone_billing, vat_payer, source
            )
            SELECT c.company_id,
                   COALESCE($2, c.name),
                   COALESCE($3, c.cui, ''),
                   $4, $5, $6, $7, $8,
                   COALESCE($9, 'RO'),
                   $10, $11, $12, $13, $14, 'USER'
            FROM companies c
            WHERE c.company_id = $1
            ON CONFLICT (company_id) DO UPDATE SET
                legal_name    = COALESCE($2, company_billing_profiles.legal_name),
                cui           = COALESCE($3, company_billing_profiles.cui),
                reg_com       = COALESCE($4, company_billing_profiles.reg_com),
                address_line  = COALESCE($5, company_billing_profiles.address_line),
                city          = COALESCE($6, company_billing_profiles.city),
                county        = COALESCE($7, company_billing_profiles.county),
                postal_code   = COALESCE($8, company_billing_profiles.postal_code),
                country       = COALESCE($9, company_billing_profiles.country),
                bank_name     = COALESCE($10, company_billing_profiles.bank_name),
                iban          = COALESCE($11, company_billing_profiles.iban),
                email_billing = COALESCE($12, company_billing_profiles.email_billing),
                phone_billing = COALESCE($13, company_billing_profiles.phone_billing),
                vat_payer     = COALESCE($14, company_billing_profiles.vat_payer),
                source        = 'USER',
                updated_at    = NOW()
            "#,
        )
        .bind(company_id)
        .bind(input.legal_name.as_deref())
        .bind(input.cui.as_deref())
        .bind(input.reg_com.as_deref())
        .bind(input.address_line.as_deref())
        .bind(input.city.as_deref())
        .bind(input.county.as_deref())
        .bind(input.postal_code.as_deref())
        .bind(input.country.as_deref())
        .bind(input.bank_name.as_deref())
        .bind(input.iban.as_deref())
        .bind(input.email_billing.as_deref())
        .bind(input.phone_billing.as_deref())
        .bind(input.vat_payer)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Usado pelo gate: só importa se o registro existe.
    pub async fn has_profile<'e, E>(&self, executor: E, company_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM company_billing_profiles WHERE company_id = $1)",
        )
        .bind(company_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Dados da parte para o PDF.
    pub async fn party_snapshot<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Option<PartySnapshot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let party = sqlx::query_as::<_, PartySnapshot>(
            r#"
            SELECT
                c.name AS company_name,
                COALESCE(p.cui, c.cui) AS cui,
                p.legal_name, p.reg_com, p.address_line, p.city, p.county, p.postal_code,
                COALESCE(p.country, 'RO') AS country,
                p.bank_name, p.iban, p.email_billing, p.phone_billing
            FROM companies c
            LEFT JOIN company_billing_profiles p ON p.company_id = c.company_id
            WHERE c.company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(executor)
        .await?;

        Ok(party)
    }
}
