//! Formula - one row of published regression coefficients
//!
//! Each formula applies to one patient category, identified by its
//! [`SelectorKey`]. Formulas are plain data; the evaluator is identical for
//! every row.

use std::fmt;

use serde::Serialize;

use crate::profile::{EggSource, PatientProfile, PriorIvf, Reason};

// ============================================================================
// SELECTOR KEY
// ============================================================================

/// Patient category a formula was fit for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorKey {
    pub using_own_eggs: bool,
    /// `None` for donor-egg formulas, where prior IVF does not apply
    pub attempted_ivf_previously: Option<bool>,
    pub is_reason_known: bool,
}

impl SelectorKey {
    /// Derive the key a profile is matched under.
    ///
    /// Only the literal `unknown` reason makes the cause unknown;
    /// `unexplained` is a diagnosed cause.
    pub fn for_profile(profile: &PatientProfile) -> Self {
        let using_own_eggs = profile.egg_source == EggSource::Own;
        let attempted_ivf_previously = if using_own_eggs {
            Some(profile.prior_ivf == PriorIvf::Yes)
        } else {
            None
        };

        Self {
            using_own_eggs,
            attempted_ivf_previously,
            is_reason_known: !profile.has_reason(Reason::Unknown),
        }
    }
}

impl fmt::Display for SelectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eggs = if self.using_own_eggs { "own eggs" } else { "donor eggs" };
        let ivf = match self.attempted_ivf_previously {
            Some(true) => "prior IVF",
            Some(false) => "no prior IVF",
            None => "prior IVF n/a",
        };
        let reason = if self.is_reason_known { "known reason" } else { "unknown reason" };
        write!(f, "{} / {} / {}", eggs, ivf, reason)
    }
}

// ============================================================================
// COEFFICIENTS
// ============================================================================

/// Coefficient pair for a binary factor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FactorPair {
    pub true_value: f64,
    pub false_value: f64,
}

impl FactorPair {
    pub fn pick(&self, present: bool) -> f64 {
        if present {
            self.true_value
        } else {
            self.false_value
        }
    }
}

/// Coefficients bucketed by a count: 0, 1, 2+
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CountBuckets {
    pub zero: f64,
    pub one: f64,
    pub two_plus: f64,
}

impl CountBuckets {
    pub fn pick(&self, count: u32) -> f64 {
        match count {
            0 => self.zero,
            1 => self.one,
            _ => self.two_plus,
        }
    }
}

/// Power term: `linear * x + power * x^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PowerTerm {
    pub linear: f64,
    pub power: f64,
    pub exponent: f64,
}

impl PowerTerm {
    pub fn apply(&self, x: f64) -> f64 {
        self.linear * x + self.power * x.powf(self.exponent)
    }
}

// ============================================================================
// FORMULA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Formula {
    pub key: SelectorKey,
    /// Published identifier, for audit only
    pub label: String,
    pub intercept: f64,
    pub age: PowerTerm,
    pub bmi: PowerTerm,
    /// Indexed like [`Reason::FACTORS`]
    pub factors: [FactorPair; 7],
    /// Applies when the cause is unexplained or unknown
    pub unexplained: FactorPair,
    pub prior_pregnancies: CountBuckets,
    pub prior_live_births: CountBuckets,
}

impl Formula {
    pub fn factor(&self, reason: Reason) -> Option<FactorPair> {
        Reason::FACTORS
            .iter()
            .position(|r| *r == reason)
            .map(|i| self.factors[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::profile;

    #[test]
    fn test_key_for_own_eggs() {
        let key = SelectorKey::for_profile(&profile(EggSource::Own, PriorIvf::Yes, &[Reason::TubalFactor]));
        assert!(key.using_own_eggs);
        assert_eq!(key.attempted_ivf_previously, Some(true));
        assert!(key.is_reason_known);

        let key = SelectorKey::for_profile(&profile(EggSource::Own, PriorIvf::No, &[Reason::Unknown]));
        assert_eq!(key.attempted_ivf_previously, Some(false));
        assert!(!key.is_reason_known);
    }

    #[test]
    fn test_key_for_donor_eggs_ignores_prior_ivf() {
        for prior in [PriorIvf::Yes, PriorIvf::No, PriorIvf::NotApplicable] {
            let key = SelectorKey::for_profile(&profile(EggSource::Donor, prior, &[Reason::UterineFactor]));
            assert!(!key.using_own_eggs);
            assert_eq!(key.attempted_ivf_previously, None);
        }
    }

    #[test]
    fn test_unexplained_counts_as_known_reason() {
        let key = SelectorKey::for_profile(&profile(EggSource::Own, PriorIvf::No, &[Reason::Unexplained]));
        assert!(key.is_reason_known);
    }

    #[test]
    fn test_empty_reasons_counts_as_known() {
        let key = SelectorKey::for_profile(&profile(EggSource::Own, PriorIvf::No, &[]));
        assert!(key.is_reason_known);
    }

    #[test]
    fn test_count_buckets_have_no_upper_bound() {
        let buckets = CountBuckets { zero: 0.0, one: 0.3, two_plus: 0.2 };
        assert_eq!(buckets.pick(0), 0.0);
        assert_eq!(buckets.pick(1), 0.3);
        assert_eq!(buckets.pick(2), 0.2);
        assert_eq!(buckets.pick(5), 0.2);
        assert_eq!(buckets.pick(u32::MAX), 0.2);
    }

    #[test]
    fn test_power_term() {
        let term = PowerTerm { linear: 0.5, power: 2.0, exponent: 2.0 };
        assert!((term.apply(3.0) - 19.5).abs() < 1e-12);
    }

    #[test]
    fn test_key_display() {
        let key = SelectorKey {
            using_own_eggs: false,
            attempted_ivf_previously: None,
            is_reason_known: false,
        };
        assert_eq!(key.to_string(), "donor eggs / prior IVF n/a / unknown reason");
    }
}
