//! Formula Evaluator
//!
//! Evaluates a formula's logit over a patient profile and converts it to a
//! cumulative chance. Pure and synchronous; safe to call from any number of
//! threads against a shared table.

use serde::{Deserialize, Serialize};

use crate::error::CalculationError;
use crate::formula::Formula;
use crate::profile::{PatientProfile, Reason};
use crate::table::FormulaTable;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Final result returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// Percentage, rounded up to two decimals
    pub cumulative_chance_percent: f64,
}

/// Intermediate values of one evaluation, for audit logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub formula: String,
    pub bmi: f64,
    pub logit: f64,
    pub probability: f64,
    pub chance_percent: f64,
}

impl From<&Evaluation> for CalculationResult {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            cumulative_chance_percent: evaluation.chance_percent,
        }
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Select the applicable formula and evaluate it
pub fn calculate(
    table: &FormulaTable,
    profile: &PatientProfile,
) -> Result<CalculationResult, CalculationError> {
    let formula = table.select(profile)?;
    evaluate(formula, profile)
}

pub fn evaluate(
    formula: &Formula,
    profile: &PatientProfile,
) -> Result<CalculationResult, CalculationError> {
    let evaluation = explain(formula, profile)?;
    tracing::debug!(
        formula = %evaluation.formula,
        bmi = evaluation.bmi,
        logit = evaluation.logit,
        probability = evaluation.probability,
        "Evaluated formula"
    );
    Ok(CalculationResult::from(&evaluation))
}

/// Evaluate and keep every intermediate value
pub fn explain(formula: &Formula, profile: &PatientProfile) -> Result<Evaluation, CalculationError> {
    let bmi = finite(profile.bmi(), "bmi")?;
    let logit = finite(logit(formula, profile, bmi), "logit")?;
    let probability = finite(logistic(logit), "probability")?;
    let chance_percent = finite(round_up_percent(probability), "chance percent")?;

    Ok(Evaluation {
        formula: formula.label.clone(),
        bmi,
        logit,
        probability,
        chance_percent,
    })
}

/// Linear predictor: intercept, age and BMI terms, factor flags, count buckets
fn logit(formula: &Formula, profile: &PatientProfile, bmi: f64) -> f64 {
    let mut logit = formula.intercept;

    logit += formula.age.apply(f64::from(profile.age));
    logit += formula.bmi.apply(bmi);

    for (reason, pair) in Reason::FACTORS.iter().zip(formula.factors.iter()) {
        logit += pair.pick(profile.has_reason(*reason));
    }

    let unexplained = profile.has_reason(Reason::Unexplained) || profile.has_reason(Reason::Unknown);
    logit += formula.unexplained.pick(unexplained);

    logit += formula.prior_pregnancies.pick(profile.prior_pregnancies);
    logit += formula.prior_live_births.pick(profile.prior_live_births);

    logit
}

/// `e^x / (1 + e^x)`, arranged so the exponent is never positive
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Probability to percent, rounded up (never to nearest) to two decimals
pub fn round_up_percent(probability: f64) -> f64 {
    (probability * 10000.0).ceil() / 100.0
}

fn finite(value: f64, stage: &'static str) -> Result<f64, CalculationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError::InvalidNumericResult(stage))
    }
}
