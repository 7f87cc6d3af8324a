//! Formula Table
//!
//! Immutable set of formulas, built once at startup and shared read-only by
//! every calculation. At most one formula per [`SelectorKey`].

use std::collections::HashMap;

use crate::error::{CalculationError, TableError};
use crate::formula::{Formula, SelectorKey};
use crate::profile::PatientProfile;

#[derive(Debug, Clone)]
pub struct FormulaTable {
    formulas: Vec<Formula>,
    index: HashMap<SelectorKey, usize>,
    fingerprint: Option<String>,
}

impl FormulaTable {
    /// Build a table from formulas in load order.
    ///
    /// Rejects an empty list and duplicate selector keys.
    pub fn new(formulas: Vec<Formula>) -> Result<Self, TableError> {
        if formulas.is_empty() {
            return Err(TableError::Empty);
        }

        let mut index = HashMap::with_capacity(formulas.len());
        for (position, formula) in formulas.iter().enumerate() {
            if let Some(first) = index.insert(formula.key, position) {
                return Err(TableError::DuplicateKey {
                    key: formula.key,
                    first,
                    second: position,
                });
            }
        }

        Ok(Self {
            formulas,
            index,
            fingerprint: None,
        })
    }

    /// Attach the SHA-256 of the source the table was parsed from
    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// All formulas, in load order
    pub fn all(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn get(&self, key: &SelectorKey) -> Option<&Formula> {
        self.index.get(key).map(|&i| &self.formulas[i])
    }

    /// Select the formula that applies to a profile
    pub fn select(&self, profile: &PatientProfile) -> Result<&Formula, CalculationError> {
        let key = SelectorKey::for_profile(profile);
        self.get(&key).ok_or(CalculationError::NoMatchingModel(key))
    }
}
