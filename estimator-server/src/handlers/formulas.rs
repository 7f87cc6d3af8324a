//! Formula table handlers

use axum::{extract::State, Json};

use crate::AppState;
use crate::models::FormulaListing;

/// List the loaded formulas and the table fingerprint
pub async fn list(State(state): State<AppState>) -> Json<FormulaListing> {
    Json(FormulaListing::from(state.table.as_ref()))
}
