// src/handlers/billing.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::company::ActingCompany,
    models::billing::{UpdateBillingProfileRequest, UpdateInvoiceSettingsRequest},
};

// GET /api/billing/profile
pub async fn get_profile(
    State(app_state): State<AppState>,
    acting: ActingCompany,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state.billing_service.get_profile(acting.company_id).await?;

    Ok((StatusCode::OK, Json(profile)))
}

// PUT /api/billing/profile
pub async fn update_profile(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Json(payload): Json<UpdateBillingProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state
        .billing_service
        .update_profile(acting.company_id, acting.user_id, payload)
        .await?;

    Ok((StatusCode::OK, Json(profile)))
}

// GET /api/billing/settings
pub async fn get_settings(
    State(app_state): State<AppState>,
    acting: ActingCompany,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state.billing_service.get_settings(acting.company_id).await?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/billing/settings
pub async fn update_settings(
    State(app_state): State<AppState>,
    acting: ActingCompany,
    Json(payload): Json<UpdateInvoiceSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state
        .billing_service
        .update_settings(acting.company_id, acting.user_id, payload)
        .await?;

    Ok((StatusCode::OK, Json(settings)))
}
