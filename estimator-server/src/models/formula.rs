//! Formula listing model

use ivf_estimator_core::{FormulaTable, SelectorKey};
use serde::Serialize;

/// One formula of the loaded table, without coefficients
#[derive(Debug, Clone, Serialize)]
pub struct FormulaSummary {
    pub label: String,
    #[serde(flatten)]
    pub key: SelectorKey,
}

/// Response of `GET /api/formulas`
#[derive(Debug, Clone, Serialize)]
pub struct FormulaListing {
    pub fingerprint: Option<String>,
    pub formulas: Vec<FormulaSummary>,
}

impl From<&FormulaTable> for FormulaListing {
    fn from(table: &FormulaTable) -> Self {
        Self {
            fingerprint: table.fingerprint().map(str::to_string),
            formulas: table
                .all()
                .iter()
                .map(|f| FormulaSummary {
                    label: f.label.clone(),
                    key: f.key,
                })
                .collect(),
        }
    }
}
