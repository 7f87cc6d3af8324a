//! Calculate request model and validation

use std::collections::{BTreeMap, BTreeSet};

use ivf_estimator_core::{EggSource, PatientProfile, PriorIvf, Reason};
use serde::Deserialize;
use validator::Validate;

use crate::{AppError, AppResult};

const UNEXPLAINED_ALONE: &str = "'Unexplained (Idiopathic) infertility' must be selected by itself";
const UNKNOWN_ALONE: &str = "'I don't know/no reason' must be selected by itself";

/// Body of `POST /api/calculate`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[validate(range(min = 20, max = 50, message = "must be between 20 and 50"))]
    pub age: i32,

    #[validate(range(min = 80.0, max = 300.0, message = "must be between 80 and 300"))]
    pub weight_lbs: f64,

    #[validate(range(min = 4, max = 6, message = "must be between 4 and 6"))]
    pub height_ft: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 11, message = "must be between 0 and 11"))]
    pub height_in: i32,

    /// "yes", "no", or blank when not applicable
    #[serde(default)]
    pub prior_ivf_cycles: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub prior_pregnancies: i32,

    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub prior_births: i32,

    #[serde(default)]
    #[validate(length(min = 1, message = "at least one reason must be selected"))]
    pub reasons: Vec<String>,

    #[serde(default)]
    pub egg_source: String,
}

impl CalculateRequest {
    /// Check every field and cross-field rule.
    ///
    /// Returns all violations keyed by the JSON field name.
    pub fn check(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();

        if let Err(e) = self.validate() {
            for (field, field_errors) in e.field_errors() {
                if let Some(message) = field_errors.iter().find_map(|fe| fe.message.as_ref()) {
                    errors.insert(camel_case(&field.to_string()), message.to_string());
                }
            }
        }

        if self.prior_births > self.prior_pregnancies {
            let entry = errors.entry("priorBirths".to_string()).or_default();
            if !entry.is_empty() {
                entry.push_str("; ");
            }
            entry.push_str("cannot exceed the number of prior pregnancies (even in the case of twins)");
        }

        let egg_source = self.egg_source();
        if egg_source.is_none() {
            errors.insert("eggSource".to_string(), "must be 'own' or 'donor'".to_string());
        }

        match self.prior_ivf() {
            Err(()) => {
                errors.insert("priorIvfCycles".to_string(), "must be 'yes', 'no', or blank".to_string());
            }
            Ok(None) if egg_source == Some(EggSource::Own) => {
                errors.insert(
                    "priorIvfCycles".to_string(),
                    "must be 'yes' or 'no' when planning to use 'own' eggs".to_string(),
                );
            }
            Ok(_) => {}
        }

        if let Some(message) = self.reasons_error() {
            errors.insert("reasons".to_string(), message);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn egg_source(&self) -> Option<EggSource> {
        match self.egg_source.as_str() {
            "own" => Some(EggSource::Own),
            "donor" => Some(EggSource::Donor),
            _ => None,
        }
    }

    fn prior_ivf(&self) -> Result<Option<bool>, ()> {
        match self.prior_ivf_cycles.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("yes") => Ok(Some(true)),
            Some("no") => Ok(Some(false)),
            Some(_) => Err(()),
        }
    }

    fn reasons_error(&self) -> Option<String> {
        if let Some(err) = self.reasons.iter().find_map(|r| r.parse::<Reason>().err()) {
            return Some(err.to_string());
        }

        // Repeated tags collapse to one
        let distinct: BTreeSet<&str> = self.reasons.iter().map(String::as_str).collect();
        if distinct.len() > 1 {
            if distinct.contains(Reason::Unexplained.as_str()) {
                return Some(UNEXPLAINED_ALONE.to_string());
            }
            if distinct.contains(Reason::Unknown.as_str()) {
                return Some(UNKNOWN_ALONE.to_string());
            }
        }

        None
    }

    /// Convert a checked request into the evaluation input
    pub fn into_profile(self) -> AppResult<PatientProfile> {
        let egg_source = self
            .egg_source()
            .ok_or_else(|| AppError::InternalError(format!("unchecked egg source {:?}", self.egg_source)))?;

        let prior_ivf = match (egg_source, self.prior_ivf()) {
            (EggSource::Donor, _) => PriorIvf::NotApplicable,
            (EggSource::Own, Ok(Some(true))) => PriorIvf::Yes,
            (EggSource::Own, Ok(Some(false))) => PriorIvf::No,
            (EggSource::Own, _) => {
                return Err(AppError::InternalError("unchecked prior IVF flag".to_string()));
            }
        };

        let reasons = self
            .reasons
            .iter()
            .map(|r| r.parse::<Reason>())
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        Ok(PatientProfile {
            age: non_negative(self.age, "age")?,
            weight_lbs: self.weight_lbs,
            height_feet: non_negative(self.height_ft, "heightFt")?,
            height_inches: non_negative(self.height_in, "heightIn")?,
            prior_ivf,
            prior_pregnancies: non_negative(self.prior_pregnancies, "priorPregnancies")?,
            prior_live_births: non_negative(self.prior_births, "priorBirths")?,
            reasons,
            egg_source,
        })
    }
}

fn non_negative(value: i32, field: &str) -> AppResult<u32> {
    u32::try_from(value).map_err(|_| AppError::InternalError(format!("unchecked negative {}", field)))
}

/// `weight_lbs` -> `weightLbs`
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
