//! Formula Table Loader
//!
//! Parses the published coefficient CSV into a [`FormulaTable`].
//! Columns are located by header name. Unparsable numbers load as `0.0`
//! with a warning rather than failing the whole table.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use sha2::{Digest, Sha256};

use crate::error::TableError;
use crate::formula::{CountBuckets, FactorPair, Formula, PowerTerm, SelectorKey};
use crate::table::FormulaTable;

// ============================================================================
// COLUMNS
// ============================================================================

const USING_OWN_EGGS: &str = "param_using_own_eggs";
const ATTEMPTED_IVF_PREVIOUSLY: &str = "param_attempted_ivf_previously";
const IS_REASON_KNOWN: &str = "param_is_reason_for_infertility_known";
const LABEL: &str = "cdc_formula";
const INTERCEPT: &str = "formula_intercept";

const AGE_COLUMNS: [&str; 3] = [
    "formula_age_linear_coefficient",
    "formula_age_power_coefficient",
    "formula_age_power_factor",
];

const BMI_COLUMNS: [&str; 3] = [
    "formula_bmi_linear_coefficient",
    "formula_bmi_power_coefficient",
    "formula_bmi_power_factor",
];

/// `(true, false)` columns, in `Reason::FACTORS` order
const FACTOR_COLUMNS: [(&str, &str); 7] = [
    ("formula_tubal_factor_true_value", "formula_tubal_factor_false_value"),
    ("formula_male_factor_infertility_true_value", "formula_male_factor_infertility_false_value"),
    ("formula_endometriosis_true_value", "formula_endometriosis_false_value"),
    ("formula_ovulatory_disorder_true_value", "formula_ovulatory_disorder_false_value"),
    ("formula_diminished_ovarian_reserve_true_value", "formula_diminished_ovarian_reserve_false_value"),
    ("formula_uterine_factor_true_value", "formula_uterine_factor_false_value"),
    ("formula_other_reason_true_value", "formula_other_reason_false_value"),
];

const UNEXPLAINED_COLUMNS: (&str, &str) = (
    "formula_unexplained_infertility_true_value",
    "formula_unexplained_infertility_false_value",
);

const PRIOR_PREGNANCIES_COLUMNS: [&str; 3] = [
    "formula_prior_pregnancies_0_value",
    "formula_prior_pregnancies_1_value",
    "formula_prior_pregnancies_2+_value",
];

const PRIOR_LIVE_BIRTHS_COLUMNS: [&str; 3] = [
    "formula_prior_live_births_0_value",
    "formula_prior_live_births_1_value",
    "formula_prior_live_births_2+_value",
];

// ============================================================================
// LOADING
// ============================================================================

impl FormulaTable {
    /// Load and fingerprint the table at `path`
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_csv_bytes(&bytes)
    }

    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self, TableError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_csv_bytes(&bytes)
    }

    fn from_csv_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let columns = Columns::from_headers(reader.headers()?)?;

        let mut formulas = Vec::new();
        for (row, record) in reader.records().enumerate() {
            formulas.push(columns.parse_row(row + 1, &record?));
        }

        let table = FormulaTable::new(formulas)?.with_fingerprint(fingerprint(bytes));
        tracing::info!(
            "Loaded {} formulas (sha256 {})",
            table.len(),
            table.fingerprint().unwrap_or_default()
        );
        Ok(table)
    }
}

/// Lower-case hex SHA-256 of the raw table source
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Header name to column position
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, TableError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        let columns = Self { index };
        for name in required_columns() {
            columns.position(name)?;
        }
        Ok(columns)
    }

    fn position(&self, name: &'static str) -> Result<usize, TableError> {
        self.index
            .get(name)
            .copied()
            .ok_or(TableError::MissingColumn(name))
    }

    fn raw<'r>(&self, record: &'r StringRecord, name: &'static str) -> &'r str {
        // Positions were checked in from_headers and csv rejects ragged rows
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }

    fn number(&self, row: usize, record: &StringRecord, name: &'static str) -> f64 {
        let raw = self.raw(record, name);
        match raw.trim().parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(row, column = name, value = raw, "Unparsable coefficient, using 0.0");
                0.0
            }
        }
    }

    fn flag(&self, record: &StringRecord, name: &'static str) -> bool {
        parse_bool(self.raw(record, name))
    }

    fn pair(&self, row: usize, record: &StringRecord, (t, f): (&'static str, &'static str)) -> FactorPair {
        FactorPair {
            true_value: self.number(row, record, t),
            false_value: self.number(row, record, f),
        }
    }

    fn power(&self, row: usize, record: &StringRecord, [linear, power, exponent]: [&'static str; 3]) -> PowerTerm {
        PowerTerm {
            linear: self.number(row, record, linear),
            power: self.number(row, record, power),
            exponent: self.number(row, record, exponent),
        }
    }

    fn buckets(&self, row: usize, record: &StringRecord, [zero, one, two_plus]: [&'static str; 3]) -> CountBuckets {
        CountBuckets {
            zero: self.number(row, record, zero),
            one: self.number(row, record, one),
            two_plus: self.number(row, record, two_plus),
        }
    }

    fn parse_row(&self, row: usize, record: &StringRecord) -> Formula {
        let using_own_eggs = self.flag(record, USING_OWN_EGGS);
        let attempted_ivf_previously = parse_optional_bool(self.raw(record, ATTEMPTED_IVF_PREVIOUSLY));
        let label = self.raw(record, LABEL).trim().to_string();

        if let Some(problem) = unselectable(using_own_eggs, attempted_ivf_previously) {
            tracing::warn!(row, label = %label, "{}", problem);
        }

        let factors = FACTOR_COLUMNS.map(|columns| self.pair(row, record, columns));

        Formula {
            key: SelectorKey {
                using_own_eggs,
                attempted_ivf_previously,
                is_reason_known: self.flag(record, IS_REASON_KNOWN),
            },
            label,
            intercept: self.number(row, record, INTERCEPT),
            age: self.power(row, record, AGE_COLUMNS),
            bmi: self.power(row, record, BMI_COLUMNS),
            factors,
            unexplained: self.pair(row, record, UNEXPLAINED_COLUMNS),
            prior_pregnancies: self.buckets(row, record, PRIOR_PREGNANCIES_COLUMNS),
            prior_live_births: self.buckets(row, record, PRIOR_LIVE_BIRTHS_COLUMNS),
        }
    }
}

fn required_columns() -> impl Iterator<Item = &'static str> {
    [USING_OWN_EGGS, ATTEMPTED_IVF_PREVIOUSLY, IS_REASON_KNOWN, LABEL, INTERCEPT]
        .into_iter()
        .chain(AGE_COLUMNS)
        .chain(BMI_COLUMNS)
        .chain(FACTOR_COLUMNS.into_iter().flat_map(|(t, f)| [t, f]))
        .chain([UNEXPLAINED_COLUMNS.0, UNEXPLAINED_COLUMNS.1])
        .chain(PRIOR_PREGNANCIES_COLUMNS)
        .chain(PRIOR_LIVE_BIRTHS_COLUMNS)
}

/// Own-egg keys always carry the prior IVF flag and donor keys never do,
/// so any other row is dead weight in the table.
fn unselectable(using_own_eggs: bool, attempted_ivf_previously: Option<bool>) -> Option<&'static str> {
    match (using_own_eggs, attempted_ivf_previously) {
        (true, None) => Some("Own-egg formula without prior IVF flag can never be selected"),
        (false, Some(_)) => Some("Donor-egg formula with a prior IVF flag can never be selected"),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("TRUE")
}

/// Empty or `N/A` means the dimension does not apply
fn parse_optional_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("N/A") {
        None
    } else {
        Some(parse_bool(raw))
    }
}
