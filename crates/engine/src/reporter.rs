// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Progress reporting.
//!
//! Reports are per-emission snapshots: every task holds its own [`Reporter`]
//! with a private steps/errors map, and only counters that must be
//! consistent across tasks (sequence number, bytes read, the first error,
//! the sink-assigned experiment id) live in shared atomic state. Nothing
//! here blocks the pipeline: a report that cannot be delivered because the
//! subscriber is slow or gone is dropped.

use parking_lot::{Mutex, RwLock};
use rigstream_model::{Report, ReportKind, ReportStatus, Step};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

struct Shared {
    channel: String,
    samples_size: u64,
    alarms_size: u64,
    has_alarms: bool,
    /// Guards sequence assignment *and* the send, so the channel order
    /// matches the sequence order even with concurrent emitters.
    seq: Mutex<u64>,
    read: AtomicU64,
    experiment_id: RwLock<String>,
    /// First failure of the run, `(step tag, message)`. Later failures keep
    /// their own reports but the terminal report carries this one.
    first_error: OnceLock<(String, String)>,
    tx: mpsc::Sender<Report>,
}

/// Per-upload factory for [`Reporter`]s, wired to one report channel.
#[derive(Clone)]
pub struct ReportHub {
    shared: Arc<Shared>,
}

impl ReportHub {
    /// Creates the hub and the report channel it feeds.
    ///
    /// `alarms_size` is `None` when the upload carried no alarms stream at
    /// all; a present but empty stream is `Some(0)`.
    #[must_use]
    pub fn new(
        channel: String,
        capacity: usize,
        samples_size: u64,
        alarms_size: Option<u64>,
    ) -> (Self, mpsc::Receiver<Report>) {
        let (tx, rx) = mpsc::channel(capacity);
        let hub = ReportHub {
            shared: Arc::new(Shared {
                channel,
                samples_size,
                alarms_size: alarms_size.unwrap_or(0),
                has_alarms: alarms_size.is_some(),
                seq: Mutex::new(0),
                read: AtomicU64::new(0),
                experiment_id: RwLock::new(String::new()),
                first_error: OnceLock::new(),
                tx,
            }),
        };
        (hub, rx)
    }

    /// Creates a reporter for one pipeline task.
    #[must_use]
    pub fn reporter(&self, kind: ReportKind) -> Reporter {
        Reporter {
            shared: Arc::clone(&self.shared),
            kind,
            status: ReportStatus::Progress,
            phase: Step::Init.to_string(),
            steps: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// The subscription key this hub reports under.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.shared.channel
    }
}

/// Emits progress snapshots for one pipeline task.
pub struct Reporter {
    shared: Arc<Shared>,
    kind: ReportKind,
    status: ReportStatus,
    phase: String,
    steps: BTreeMap<String, bool>,
    errors: BTreeMap<String, String>,
}

impl Reporter {
    /// Adds consumed bytes to the shared counter.
    pub fn add_read(&self, bytes: u64) {
        let _ = self.shared.read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Publishes the sink-assigned experiment id to every later snapshot.
    pub fn set_experiment_id(&self, id: &str) {
        *self.shared.experiment_id.write() = id.to_owned();
    }

    /// Records a completed step and emits a snapshot.
    pub fn success(&mut self, step: Step) {
        self.phase = step.to_string();
        let _ = self.steps.insert(self.phase.clone(), true);
        tracing::info!(step = %step, kind = self.kind.as_str(), "step completed");
        self.emit();
    }

    /// Records a failed step, remembers the run's first error and emits a
    /// failure snapshot.
    pub fn failure(&mut self, step: Step, message: impl ToString) {
        let message = message.to_string();
        self.phase = step.to_string();
        self.status = ReportStatus::Failure;
        let _ = self.steps.insert(self.phase.clone(), false);
        let _ = self.errors.insert(self.phase.clone(), message.clone());
        let _ = self
            .shared
            .first_error
            .set((self.phase.clone(), message.clone()));
        tracing::error!(step = %step, kind = self.kind.as_str(), error = %message, "step failed");
        self.emit();
    }

    /// Emits the terminal success snapshot (`9_END`, progress 100).
    pub fn terminal_success(&mut self) {
        self.phase = Step::End.to_string();
        let _ = self.steps.insert(self.phase.clone(), true);
        self.status = ReportStatus::Success;
        tracing::info!(kind = self.kind.as_str(), "run completed");
        self.emit();
    }

    /// Emits the terminal failure snapshot, carrying the run's first error
    /// and the outcome of the compensation.
    pub fn terminal_failure(&mut self, compensation: Result<(), String>) {
        if let Some((step, message)) = self.shared.first_error.get() {
            let _ = self.steps.insert(step.clone(), false);
            let _ = self.errors.insert(step.clone(), message.clone());
            self.phase = step.clone();
        }
        let cancel_tag = Step::Cancel.to_string();
        match compensation {
            Ok(()) => {
                let _ = self.steps.insert(cancel_tag, true);
            }
            Err(message) => {
                let _ = self.steps.insert(cancel_tag.clone(), false);
                let _ = self.errors.insert(cancel_tag, message);
            }
        }
        self.status = ReportStatus::Failure;
        tracing::warn!(kind = self.kind.as_str(), "run failed");
        self.emit();
    }

    /// Merges the steps and errors of an earlier report into this reporter,
    /// so snapshots keep carrying stages that ran before the hub existed.
    pub fn absorb(&mut self, report: &Report) {
        for (tag, done) in &report.steps {
            let _ = self.steps.insert(tag.clone(), *done);
        }
        for (tag, message) in &report.errors {
            let _ = self.errors.insert(tag.clone(), message.clone());
        }
        if report.status == ReportStatus::Failure {
            self.status = ReportStatus::Failure;
        }
    }

    /// Current snapshot, as the next emission would serialize it.
    #[must_use]
    pub fn snapshot(&self) -> Report {
        let read = self.shared.read.load(Ordering::Relaxed);
        let mut report = Report::new(self.shared.channel.clone());
        report.seq = *self.shared.seq.lock();
        report.kind = self.kind;
        report.status = self.status;
        report.phase = self.phase.clone();
        report.experiment_id = self.shared.experiment_id.read().clone();
        report.has_alarms = self.shared.has_alarms;
        report.samples_size = self.shared.samples_size;
        report.alarms_size = self.shared.alarms_size;
        report.steps = self.steps.clone();
        report.errors = self.errors.clone();
        report.set_read(read);
        if self.status == ReportStatus::Success {
            report.end();
        }
        report
    }

    fn emit(&self) {
        let mut report = self.snapshot();
        let mut seq = self.shared.seq.lock();
        *seq += 1;
        report.seq = *seq;
        // A full queue or a vanished subscriber never stalls the pipeline.
        if let Err(e) = self.shared.tx.try_send(report) {
            tracing::debug!(channel = %self.shared.channel, "report dropped: {e}");
        }
    }
}
