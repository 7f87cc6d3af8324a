//! Synthetic six-row coefficient table covering every selector key.
//! Not published coefficients.

use std::collections::BTreeSet;

use crate::profile::{EggSource, PatientProfile, PriorIvf, Reason};
use crate::table::FormulaTable;

pub const CSV: &str = include_str!("../testdata/formulas.csv");

pub fn table() -> FormulaTable {
    FormulaTable::from_csv_reader(CSV.as_bytes()).expect("fixture table loads")
}

/// Age 32, 5'6", 141 lbs, one pregnancy, one live birth
pub fn profile(egg_source: EggSource, prior_ivf: PriorIvf, reasons: &[Reason]) -> PatientProfile {
    PatientProfile {
        age: 32,
        weight_lbs: 141.0,
        height_feet: 5,
        height_inches: 6,
        prior_ivf,
        prior_pregnancies: 1,
        prior_live_births: 1,
        reasons: reasons.iter().copied().collect::<BTreeSet<_>>(),
        egg_source,
    }
}
