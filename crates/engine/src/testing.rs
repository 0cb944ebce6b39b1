// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a scripted sink that records every call.

use async_trait::async_trait;
use parking_lot::Mutex;
use rigstream_model::{Alarm, Experiment, Measure, Sample};
use rigstream_sink::{Error, Sink};
use std::sync::Arc;

/// One recorded sink invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    /// `save_experiment`, with the descriptor as received.
    Experiment(Experiment),
    /// `save_measures`.
    Measures(Vec<Measure>),
    /// `save_samples`.
    Samples(Vec<Sample>),
    /// `save_alarms`.
    Alarms(Vec<Alarm>),
    /// `cancel`.
    Cancel,
    /// `end`.
    End,
}

/// Failure script for a [`RecordingSink`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureScript {
    /// Fail `save_experiment`.
    pub experiment: bool,
    /// Fail `save_measures`.
    pub measures: bool,
    /// Fail the nth (1-based) `save_samples` call.
    pub samples_call: Option<u32>,
    /// Fail `save_alarms`.
    pub alarms: bool,
    /// Fail `cancel`.
    pub cancel: bool,
}

/// Sink that records calls and fails on script, for pipeline tests.
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    script: FailureScript,
    samples_calls: u32,
}

impl RecordingSink {
    /// Creates a well-behaved recording sink.
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<Vec<SinkCall>>>) {
        Self::with_script(FailureScript::default())
    }

    /// Creates a recording sink with the given failure script.
    #[must_use]
    pub fn with_script(script: FailureScript) -> (Self, Arc<Mutex<Vec<SinkCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingSink {
                calls: Arc::clone(&calls),
                script,
                samples_calls: 0,
            },
            calls,
        )
    }

    fn scripted_failure(&self, op: &str) -> Error {
        Error::Backend {
            status: 500,
            details: format!("scripted {op} failure"),
        }
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn save_experiment(&mut self, experiment: &mut Experiment) -> Result<(), Error> {
        if self.script.experiment {
            return Err(self.scripted_failure("save_experiment"));
        }
        experiment.id = "exp-under-test".to_owned();
        self.calls
            .lock()
            .push(SinkCall::Experiment(experiment.clone()));
        Ok(())
    }

    async fn save_measures(&mut self, measures: &[Measure]) -> Result<(), Error> {
        if self.script.measures {
            return Err(self.scripted_failure("save_measures"));
        }
        self.calls.lock().push(SinkCall::Measures(measures.to_vec()));
        Ok(())
    }

    async fn save_samples(&mut self, samples: &[Sample]) -> Result<(), Error> {
        self.samples_calls += 1;
        if self.script.samples_call == Some(self.samples_calls) {
            return Err(self.scripted_failure("save_samples"));
        }
        self.calls.lock().push(SinkCall::Samples(samples.to_vec()));
        Ok(())
    }

    async fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), Error> {
        if self.script.alarms {
            return Err(self.scripted_failure("save_alarms"));
        }
        self.calls.lock().push(SinkCall::Alarms(alarms.to_vec()));
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), Error> {
        if self.script.cancel {
            return Err(self.scripted_failure("cancel"));
        }
        self.calls.lock().push(SinkCall::Cancel);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), Error> {
        self.calls.lock().push(SinkCall::End);
        Ok(())
    }
}
