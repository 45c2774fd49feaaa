// src/handlers/rates.rs

use axum::{extract::State, Json};

use crate::{config::AppState, services::rates::RateCatalogue};

// GET /api/rates
pub async fn list_rates(State(app_state): State<AppState>) -> Json<RateCatalogue> {
    Json(app_state.rates.catalogue())
}
