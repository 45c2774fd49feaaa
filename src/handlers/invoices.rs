// src/handlers/invoices.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, middleware::company::ActingCompany};

// GET /api/invoices
pub async fn list_invoices(
    State(app_state): State<AppState>,
    acting: ActingCompany,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state.invoice_service.list_invoices(acting.company_id).await?;

    Ok((StatusCode::OK, Json(invoices)))
}

// GET /api/invoices/{id}
pub async fn get_invoice(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_service
        .get_invoice(acting.company_id, invoice_id)
        .await?;

    Ok((StatusCode::OK, Json(invoice)))
}

// GET /api/invoices/{id}/pdf
pub async fn download_invoice_pdf(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (invoice_number, pdf_bytes) = app_state
        .invoice_service
        .invoice_pdf(acting.company_id, invoice_id)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.pdf\"", invoice_number),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
