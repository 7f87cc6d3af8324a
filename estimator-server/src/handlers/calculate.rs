//! Calculate handler

use axum::{extract::{rejection::JsonRejection, State}, Json};
use ivf_estimator_core::CalculationResult;

use crate::{AppState, AppResult, AppError};
use crate::models::CalculateRequest;

/// Estimate the cumulative chance of success for one patient
pub async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> AppResult<Json<CalculationResult>> {
    let Json(req) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    req.check().map_err(AppError::ValidationFailed)?;
    let profile = req.into_profile()?;

    let result = ivf_estimator_core::calculate(&state.table, &profile)?;
    tracing::info!(
        egg_source = ?profile.egg_source,
        chance = result.cumulative_chance_percent,
        "Calculated cumulative chance"
    );

    Ok(Json(result))
}
