// src/common/error.rs

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// SQLSTATEs do Postgres que indicam que a transação inteira pode ser repetida
const LOCK_NOT_AVAILABLE: &str = "55P03";
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("missing x-company-id header")]
    MissingCompanyContext,

    #[error("x-company-id / x-user-id header is not a valid UUID")]
    InvalidCompanyContext,

    // --- NotFound ---
    #[error("batch not found")]
    BatchNotFound,

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("relationship not found")]
    RelationshipNotFound,

    #[error("company not found")]
    CompanyNotFound,

    #[error("invoice document unavailable")]
    DocumentNotFound,

    // --- Forbidden ---
    #[error("{0}")]
    Forbidden(String),

    // --- Conflict ---
    #[error("relationship is not active")]
    RelationshipNotActive,

    #[error("{0}")]
    BatchStateConflict(String),

    #[error("invoice number {0} already issued")]
    DuplicateInvoiceNumber(String),

    // --- UnprocessableEntity ---
    #[error("{0}")]
    BillingNotReady(String),

    #[error("invalid battery line '{key}': {reason}")]
    InvalidBatteryLine { key: String, reason: String },

    #[error("at least one battery line must have a value greater than zero")]
    EmptyBatch,

    #[error("{0}")]
    AmountOutOfRange(String),

    #[error("next_number ({requested}) cannot be lower than the current value ({current})")]
    SequenceDecrease { requested: i32, current: i32 },

    // --- Retryable ---
    #[error("transient database conflict: {0}")]
    Retryable(String),

    #[error("document store failure: {0}")]
    DocumentStore(String),

    // --- Internos ---
    #[error("Erro de banco de dados")]
    DatabaseError(sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// Não usamos #[from] aqui: timeouts de lock e deadlocks precisam virar Retryable
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    LOCK_NOT_AVAILABLE | DEADLOCK_DETECTED | SERIALIZATION_FAILURE => {
                        return AppError::Retryable(db_err.message().to_string());
                    }
                    _ => {}
                }
            }
        }
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return AppError::Retryable("connection pool timed out".into());
        }
        AppError::DatabaseError(err)
    }
}

impl AppError {
    /// Nada foi confirmado: o cliente pode repetir a operação inteira.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Retryable(_) | AppError::DocumentStore(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::MissingCompanyContext
            | AppError::InvalidCompanyContext => StatusCode::BAD_REQUEST,

            AppError::BatchNotFound
            | AppError::InvoiceNotFound
            | AppError::RelationshipNotFound
            | AppError::CompanyNotFound
            | AppError::DocumentNotFound => StatusCode::NOT_FOUND,

            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            AppError::RelationshipNotActive
            | AppError::BatchStateConflict(_)
            | AppError::DuplicateInvoiceNumber(_) => StatusCode::CONFLICT,

            AppError::BillingNotReady(_)
            | AppError::InvalidBatteryLine { .. }
            | AppError::EmptyBatch
            | AppError::AmountOutOfRange(_)
            | AppError::SequenceDecrease { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::Retryable(_) | AppError::DocumentStore(_) => StatusCode::SERVICE_UNAVAILABLE,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Retornar todos os detalhes da validação.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "One or more fields are invalid.",
                "details": details,
            }));
            return (status, body).into_response();
        }

        if self.is_retryable() {
            tracing::warn!("Falha transitória, cliente pode repetir: {}", self);
            let body = Json(json!({ "error": self.to_string(), "retryable": true }));
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente recebe algo genérico.
            match &self {
                AppError::DatabaseError(e) => tracing::error!("Erro Interno do Servidor: {:?}", e),
                other => tracing::error!("Erro Interno do Servidor: {:?}", other),
            }
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
