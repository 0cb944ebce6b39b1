// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Core data model shared by every rigstream crate.
//!
//! The types here describe one upload end to end: the [`Experiment`]
//! descriptor, the measure schema ([`Measure`]), the individual data points
//! ([`Sample`], [`Alarm`]), and the progress [`Report`] snapshots streamed
//! back to the uploader.

pub mod error;
mod experiment;
mod measure;
mod report;
mod step;

pub use error::Error;
pub use experiment::Experiment;
pub use measure::Measure;
pub use report::{Report, ReportKind, ReportStatus};
pub use step::Step;

use serde::{Deserialize, Serialize};

/// One cell of the samples matrix, pointing back at its measure by position.
///
/// The time of day and the value are kept as raw strings: the time is only
/// resolved against the experiment start date at write time, and the storage
/// type of the value is a sink decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// 0-based position of the measure this cell belongs to.
    pub measure_index: usize,
    /// Time of day as found in the stream (`HH:MM:SS.mmm` or `MM:SS.mmm`).
    pub time_of_day: String,
    /// Raw cell content.
    pub value: String,
}

/// One alarm event, independent of the measure schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Time of day extracted from the alarm line.
    pub time_of_day: String,
    /// Severity level.
    pub level: i64,
    /// Free-form alarm message.
    pub message: String,
}
