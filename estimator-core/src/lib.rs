//! IVF Success Estimator - Core
//!
//! Selects the published regression formula that applies to a patient and
//! evaluates it into a cumulative chance of success.
//!
//! # Flow
//!
//! ```text
//! PatientProfile ──► FormulaTable::select ──► Formula ──► evaluate ──► CalculationResult
//!                      (SelectorKey lookup)                (logit → logistic → ceil %)
//! ```
//!
//! The [`FormulaTable`] is loaded once (see [`FormulaTable::from_csv_path`])
//! and passed by reference into [`calculate`]. Nothing here mutates it.

pub mod error;
pub mod evaluator;
pub mod formula;
pub mod loader;
pub mod profile;
pub mod table;

#[cfg(test)]
mod fixture;

pub use error::{CalculationError, TableError};
pub use evaluator::{calculate, evaluate, explain, CalculationResult, Evaluation};
pub use formula::{CountBuckets, FactorPair, Formula, PowerTerm, SelectorKey};
pub use profile::{EggSource, PatientProfile, PriorIvf, Reason, UnknownReason};
pub use table::FormulaTable;
