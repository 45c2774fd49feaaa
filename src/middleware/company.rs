// src/middleware/company.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// Cabeçalhos preenchidos pelo gateway de autenticação
const COMPANY_ID_HEADER: &str = "x-company-id";
const USER_ID_HEADER: &str = "x-user-id";

/// Empresa em nome da qual a requisição age (e o usuário, quando conhecido).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingCompany {
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for ActingCompany
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let company_id = match header_uuid(parts, COMPANY_ID_HEADER)? {
            Some(id) => id,
            None => return Err(AppError::MissingCompanyContext),
        };
        let user_id = header_uuid(parts, USER_ID_HEADER)?;

        Ok(ActingCompany { company_id, user_id })
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Option<Uuid>, AppError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let text = value.to_str().map_err(|_| AppError::InvalidCompanyContext)?;
            Uuid::parse_str(text.trim())
                .map(Some)
                .map_err(|_| AppError::InvalidCompanyContext)
        }
    }
}
