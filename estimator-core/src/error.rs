//! Error types

use thiserror::Error;

use crate::formula::SelectorKey;

/// Failure to populate the formula table at startup.
///
/// Fatal: a process that hits one of these must not serve calculations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read formula table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed formula table: {0}")]
    Csv(#[from] csv::Error),

    #[error("formula table is missing column `{0}`")]
    MissingColumn(&'static str),

    #[error("formula table contains no formulas")]
    Empty,

    #[error("duplicate formula for {key} (rows {first} and {second})")]
    DuplicateKey {
        key: SelectorKey,
        first: usize,
        second: usize,
    },
}

/// Failure of a single calculation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    /// No formula in the table carries the profile's selector key.
    #[error("no applicable formula for {0}")]
    NoMatchingModel(SelectorKey),

    /// An intermediate or final value was NaN or infinite.
    #[error("calculation produced a non-finite {0}")]
    InvalidNumericResult(&'static str),
}
