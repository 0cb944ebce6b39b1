// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Sink that discards everything.

use crate::Sink;
use crate::error::Error;
use async_trait::async_trait;
use rigstream_model::{Alarm, Experiment, Measure, Sample};

/// Accepts the whole stream and drops it. Useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl Sink for NoopSink {
    async fn save_experiment(&mut self, _experiment: &mut Experiment) -> Result<(), Error> {
        Ok(())
    }

    async fn save_measures(&mut self, _measures: &[Measure]) -> Result<(), Error> {
        Ok(())
    }

    async fn save_samples(&mut self, _samples: &[Sample]) -> Result<(), Error> {
        Ok(())
    }

    async fn save_alarms(&mut self, _alarms: &[Alarm]) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
