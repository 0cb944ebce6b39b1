// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Progress report snapshots streamed back to the uploader.

use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which pipeline the report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Pre-ingest stages (extraction, header, experiment persistence).
    Experiment,
    /// The samples pipeline.
    Samples,
    /// The alarms pipeline.
    Alarms,
    /// Writer-side terminal reports addressed to the subscriber.
    Client,
}

impl ReportKind {
    /// Stable lowercase label, also used as the SSE event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Experiment => "experiment",
            ReportKind::Samples => "samples",
            ReportKind::Alarms => "alarms",
            ReportKind::Client => "client",
        }
    }
}

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// The run is still making progress.
    Progress,
    /// The run completed.
    Success,
    /// The run failed and was compensated.
    Failure,
}

/// One serializable snapshot of an ingest's progress.
///
/// Reports are immutable once emitted; every update is a fresh snapshot with
/// a strictly larger `seq`. Terminal statuses never regress and `progress`
/// is monotonically non-decreasing across the snapshots of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Monotonically increasing sequence number within the channel.
    pub seq: u64,
    /// Opaque subscription key of the upload.
    pub channel: String,
    /// Step tag the report was emitted for.
    pub phase: String,
    /// Which pipeline emitted the report.
    pub kind: ReportKind,
    /// Lifecycle state.
    pub status: ReportStatus,
    /// Sink-assigned experiment id, empty until known.
    pub experiment_id: String,
    /// Whether the upload carried an alarms stream.
    pub has_alarms: bool,
    /// Total size of the samples part in bytes.
    pub samples_size: u64,
    /// Total size of the alarms part in bytes.
    pub alarms_size: u64,
    /// Bytes consumed so far, across both streams.
    pub read: u64,
    /// Percentage of the samples stream consumed, clamped to 100.
    pub progress: u64,
    /// Outcome per completed step tag (`false` marks the failed step).
    pub steps: BTreeMap<String, bool>,
    /// Error message per failed step tag.
    pub errors: BTreeMap<String, String>,
}

impl Report {
    /// Creates an empty snapshot for a channel.
    #[must_use]
    pub fn new(channel: String) -> Self {
        Report {
            seq: 1,
            channel,
            phase: Step::Init.to_string(),
            kind: ReportKind::Experiment,
            status: ReportStatus::Progress,
            experiment_id: String::new(),
            has_alarms: false,
            samples_size: 0,
            alarms_size: 0,
            read: 0,
            progress: 0,
            steps: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Marks a step as successfully completed.
    pub fn add_success(&mut self, step: Step) {
        self.phase = step.to_string();
        let _ = self.steps.insert(self.phase.clone(), true);
    }

    /// Marks a step as failed and flips the status to failure.
    pub fn add_error(&mut self, step: Step, message: impl Into<String>) {
        self.phase = step.to_string();
        self.status = ReportStatus::Failure;
        let _ = self.steps.insert(self.phase.clone(), false);
        let _ = self.errors.insert(self.phase.clone(), message.into());
    }

    /// Updates the byte counters and recomputes the progress percentage.
    ///
    /// The denominator is the samples size only; alarm bytes still count
    /// towards `read`.
    pub fn set_read(&mut self, read: u64) {
        self.read = read;
        self.progress = if self.samples_size == 0 {
            0
        } else {
            (read.saturating_mul(100) / self.samples_size).min(100)
        };
    }

    /// Marks the run as successfully completed.
    pub fn end(&mut self) {
        self.status = ReportStatus::Success;
        self.progress = 100;
    }

    /// Whether any step has failed so far.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the report carries a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status != ReportStatus::Progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_uses_samples_size_only() {
        let mut report = Report::new("c".into());
        report.samples_size = 200;
        report.alarms_size = 1_000;
        report.set_read(50);
        assert_eq!(report.progress, 25);
    }

    #[test]
    fn progress_is_clamped_to_100() {
        let mut report = Report::new("c".into());
        report.samples_size = 10;
        report.set_read(500);
        assert_eq!(report.progress, 100);
    }

    #[test]
    fn progress_with_zero_size_stays_zero() {
        let mut report = Report::new("c".into());
        report.set_read(42);
        assert_eq!(report.progress, 0);
    }

    #[test]
    fn error_forces_failure_status() {
        let mut report = Report::new("c".into());
        report.add_error(Step::ParseMeasures, "types length mismatch");
        assert_eq!(report.status, ReportStatus::Failure);
        assert!(report.has_error());
        assert!(report.is_terminal());
        assert_eq!(report.steps.get("8.1.1_PARSE_MEASURES"), Some(&false));
        assert_eq!(
            report.errors.get("8.1.1_PARSE_MEASURES").map(String::as_str),
            Some("types length mismatch")
        );
    }

    #[test]
    fn serializes_with_spec_field_names() {
        let mut report = Report::new("chan-1".into());
        report.add_success(Step::ParseHeader);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["channel"], "chan-1");
        assert_eq!(json["kind"], "experiment");
        assert_eq!(json["status"], "progress");
        assert_eq!(json["phase"], "5_PARSE_HEADER");
        assert_eq!(json["experimentId"], "");
        assert_eq!(json["hasAlarms"], false);
        assert_eq!(json["samplesSize"], 0);
        assert_eq!(json["steps"]["5_PARSE_HEADER"], true);
    }
}
