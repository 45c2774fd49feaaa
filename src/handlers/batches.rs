// src/handlers/batches.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::company::ActingCompany,
    models::batch::{BatchFilter, CreateBatchPayload},
};

// POST /api/batches
pub async fn create_batch(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Json(payload): Json<CreateBatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let batch = app_state
        .batch_service
        .create_batch(acting.company_id, acting.user_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(batch)))
}

// GET /api/batches?kind=COLLECTION&status=PENDING
pub async fn list_batches(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Query(filter): Query<BatchFilter>,
) -> Result<impl IntoResponse, AppError> {
    let batches = app_state
        .batch_service
        .list_batches(acting.company_id, &filter)
        .await?;

    Ok((StatusCode::OK, Json(batches)))
}

// GET /api/batches/{id}
pub async fn get_batch(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batch = app_state
        .batch_service
        .get_batch(acting.company_id, batch_id)
        .await?;

    Ok((StatusCode::OK, Json(batch)))
}

// POST /api/batches/{id}/validate
// Repetir a chamada num lote já validado devolve a mesma fatura (200).
pub async fn validate_batch(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .invoice_service
        .validate_batch(batch_id, acting.company_id, acting.user_id)
        .await?;

    let status = if outcome.already_validated { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(outcome)))
}
