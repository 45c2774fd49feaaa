// src/models/billing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// 1. Perfil de faturação (1:1 com companies)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillingProfile {
    pub company_id: Uuid,
    // Sem perfil gravado, caímos no nome/CUI da empresa
    pub legal_name: String,
    pub cui: Option<String>,
    pub reg_com: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub email_billing: Option<String>,
    pub phone_billing: Option<String>,
    pub vat_payer: Option<bool>,
    pub source: String,
    pub has_profile: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillingProfileRequest {
    #[validate(length(min = 1, max = 200, message = "legalName must have 1-200 characters"))]
    pub legal_name: Option<String>,
    #[validate(length(min = 2, max = 20, message = "cui must have 2-20 characters"))]
    pub cui: Option<String>,
    pub reg_com: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    #[validate(length(equal = 2, message = "country must be an ISO 3166-1 alpha-2 code"))]
    pub country: Option<String>,
    pub bank_name: Option<String>,
    #[validate(length(min = 15, max = 34, message = "iban has an invalid length"))]
    pub iban: Option<String>,
    #[validate(email(message = "emailBilling is not a valid e-mail"))]
    pub email_billing: Option<String>,
    pub phone_billing: Option<String>,
    pub vat_payer: Option<bool>,
}

/// Dados de uma das partes, como aparecem no PDF.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PartySnapshot {
    pub company_name: String,
    pub cui: Option<String>,
    pub legal_name: Option<String>,
    pub reg_com: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub email_billing: Option<String>,
    pub phone_billing: Option<String>,
}

impl PartySnapshot {
    pub fn display_name(&self) -> &str {
        self.legal_name.as_deref().unwrap_or(&self.company_name)
    }

    /// "Rua X, Cluj-Napoca jud. Cluj 400000, RO"
    pub fn address(&self) -> String {
        let mut parts = Vec::new();
        if let Some(line) = self.address_line.as_deref().filter(|s| !s.is_empty()) {
            parts.push(line.to_string());
        }
        let city_line = [
            self.city.clone(),
            self.county.as_ref().map(|c| format!("jud. {}", c)),
            self.postal_code.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        if !city_line.is_empty() {
            parts.push(city_line);
        }
        if !self.country.is_empty() {
            parts.push(self.country.clone());
        }
        parts.join(", ")
    }
}

// ---
// 2. Estado da numeração (uma linha por BASE)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSettings {
    pub base_company_id: Uuid,
    pub series_code: String,
    pub next_number: i32,
    pub year_reset: bool,
    pub due_days: i32,
    pub default_vat_rate: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceSettingsRequest {
    #[validate(length(min = 1, max = 16, message = "seriesCode must have 1-16 characters"))]
    pub series_code: Option<String>,
    pub year_reset: Option<bool>,
    #[validate(range(min = 0, max = 120, message = "dueDays must be between 0 and 120"))]
    pub due_days: Option<i32>,
    #[validate(custom(function = "validate_vat_rate"))]
    pub default_vat_rate: Option<Decimal>,
    #[validate(range(min = 1, message = "nextNumber must be >= 1"))]
    pub next_number: Option<i32>,
}

fn validate_vat_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::from(99) {
        let mut err = ValidationError::new("range");
        err.message = Some("defaultVatRate must be between 0 and 99".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn settings_payload_bounds() {
        let ok = UpdateInvoiceSettingsRequest {
            due_days: Some(30),
            default_vat_rate: Some(dec!(21.00)),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_vat = UpdateInvoiceSettingsRequest {
            default_vat_rate: Some(dec!(120)),
            ..Default::default()
        };
        assert!(bad_vat.validate().is_err());

        let bad_number = UpdateInvoiceSettingsRequest {
            next_number: Some(0),
            ..Default::default()
        };
        assert!(bad_number.validate().is_err());
    }

    #[test]
    fn party_address_skips_missing_parts() {
        let party = PartySnapshot {
            company_name: "Baza SRL".into(),
            address_line: Some("Str. Fabricii 3".into()),
            county: Some("Cluj".into()),
            country: "RO".into(),
            ..Default::default()
        };
        assert_eq!(party.address(), "Str. Fabricii 3, jud. Cluj, RO");
        assert_eq!(party.display_name(), "Baza SRL");
    }
}
