//! Patient Profile
//!
//! Typed evaluation input. Built by the transport layer after validation;
//! the evaluator trusts it and does not re-check ranges.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// ENUMS
// ============================================================================

/// Where the eggs for the planned cycle come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EggSource {
    Own,
    Donor,
}

/// Whether the patient has undergone IVF before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorIvf {
    Yes,
    No,
    /// Only meaningful for donor eggs
    NotApplicable,
}

/// Reason for infertility, as offered by the intake form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    TubalFactor,
    MaleFactorInfertility,
    Endometriosis,
    OvulatoryDisorder,
    DiminishedOvarianReserve,
    UterineFactor,
    Other,
    Unexplained,
    Unknown,
}

impl Reason {
    /// Binary factor categories, in formula column order
    pub const FACTORS: [Reason; 7] = [
        Reason::TubalFactor,
        Reason::MaleFactorInfertility,
        Reason::Endometriosis,
        Reason::OvulatoryDisorder,
        Reason::DiminishedOvarianReserve,
        Reason::UterineFactor,
        Reason::Other,
    ];

    pub const ALL: [Reason; 9] = [
        Reason::TubalFactor,
        Reason::MaleFactorInfertility,
        Reason::Endometriosis,
        Reason::OvulatoryDisorder,
        Reason::DiminishedOvarianReserve,
        Reason::UterineFactor,
        Reason::Other,
        Reason::Unexplained,
        Reason::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::TubalFactor => "tubal_factor",
            Reason::MaleFactorInfertility => "male_factor_infertility",
            Reason::Endometriosis => "endometriosis",
            Reason::OvulatoryDisorder => "ovulatory_disorder",
            Reason::DiminishedOvarianReserve => "diminished_ovarian_reserve",
            Reason::UterineFactor => "uterine_factor",
            Reason::Other => "other",
            Reason::Unexplained => "unexplained",
            Reason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag outside the reason vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReason(pub String);

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid reason: {}", self.0)
    }
}

impl std::error::Error for UnknownReason {}

impl FromStr for Reason {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownReason(s.to_string()))
    }
}

// ============================================================================
// PROFILE
// ============================================================================

/// Patient profile for one calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: u32,
    pub weight_lbs: f64,
    pub height_feet: u32,
    /// 0 - 11
    pub height_inches: u32,
    pub prior_ivf: PriorIvf,
    pub prior_pregnancies: u32,
    pub prior_live_births: u32,
    pub reasons: BTreeSet<Reason>,
    pub egg_source: EggSource,
}

impl PatientProfile {
    pub fn has_reason(&self, reason: Reason) -> bool {
        self.reasons.contains(&reason)
    }

    /// Computed in `f64` so out-of-range heights cannot overflow
    pub fn total_height_inches(&self) -> f64 {
        f64::from(self.height_feet) * 12.0 + f64::from(self.height_inches)
    }

    /// Body mass index from imperial units
    pub fn bmi(&self) -> f64 {
        self.weight_lbs / self.total_height_inches().powi(2) * 703.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_tags_round_trip_through_from_str() {
        for reason in Reason::ALL {
            assert_eq!(reason.as_str().parse::<Reason>(), Ok(reason));
        }
    }

    #[test]
    fn test_reason_rejects_unlisted_tag() {
        let err = "male_factor".parse::<Reason>().unwrap_err();
        assert_eq!(err.to_string(), "invalid reason: male_factor");
    }

    #[test]
    fn test_bmi_from_feet_and_inches() {
        let profile = PatientProfile {
            age: 32,
            weight_lbs: 141.0,
            height_feet: 5,
            height_inches: 6,
            prior_ivf: PriorIvf::No,
            prior_pregnancies: 1,
            prior_live_births: 1,
            reasons: BTreeSet::from([Reason::Endometriosis]),
            egg_source: EggSource::Own,
        };

        assert_eq!(profile.total_height_inches(), 66.0);
        assert!((profile.bmi() - 22.7555).abs() < 1e-3);
    }

    #[test]
    fn test_total_height_does_not_overflow() {
        let profile = PatientProfile {
            age: 32,
            weight_lbs: 141.0,
            height_feet: u32::MAX,
            height_inches: u32::MAX,
            prior_ivf: PriorIvf::No,
            prior_pregnancies: 0,
            prior_live_births: 0,
            reasons: BTreeSet::new(),
            egg_source: EggSource::Own,
        };

        assert_eq!(profile.total_height_inches(), f64::from(u32::MAX) * 13.0);
        assert!(profile.bmi().is_finite());
    }
}
