// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The experiment descriptor attached to every upload.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of the run being uploaded; scopes all downstream points.
///
/// Built from the upload's `experiment` form field, validated before any
/// I/O happens, then treated as immutable for the rest of the ingest. The
/// two exceptions are `id`, assigned by the sink when the descriptor is
/// persisted, and the date pair, filled in from the samples header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Opaque identifier, empty until the sink assigns one.
    #[serde(default)]
    pub id: String,
    /// External reference of the run.
    pub reference: String,
    /// Human-readable name.
    pub name: String,
    /// Test bench the run was recorded on.
    pub bench: String,
    /// Campaign the run belongs to.
    pub campaign: String,
    /// Absolute start instant, parsed from the samples header.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Absolute end instant, parsed from the samples header.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Experiment {
    /// Parses a descriptor from its JSON form value and validates it.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let experiment: Experiment = serde_json::from_str(raw)?;
        experiment.validate()?;
        Ok(experiment)
    }

    /// Checks that every required field is non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("reference", &self.reference),
            ("name", &self.name),
            ("bench", &self.bench),
            ("campaign", &self.campaign),
        ] {
            if value.is_empty() {
                return Err(Error::EmptyExperimentField { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> &'static str {
        r#"{"reference":"REF-42","name":"thermal sweep","bench":"B2","campaign":"Q3"}"#
    }

    #[test]
    fn parses_and_validates_descriptor() {
        let experiment = Experiment::from_json(descriptor()).unwrap();
        assert_eq!(experiment.reference, "REF-42");
        assert_eq!(experiment.bench, "B2");
        assert!(experiment.id.is_empty());
        assert!(experiment.start_date.is_none());
    }

    #[test]
    fn rejects_empty_required_field() {
        let raw = r#"{"reference":"","name":"n","bench":"b","campaign":"c"}"#;
        let err = Experiment::from_json(raw).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyExperimentField { field: "reference" }
        ));
    }

    #[test]
    fn rejects_missing_field() {
        let raw = r#"{"reference":"r","name":"n","bench":"b"}"#;
        assert!(matches!(
            Experiment::from_json(raw),
            Err(Error::InvalidDescriptor(_))
        ));
    }
}
