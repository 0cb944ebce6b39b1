// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Sink adapters: where parsed telemetry ends up.
//!
//! A [`Sink`] receives the experiment descriptor, the measure schema and the
//! sample/alarm batches of one run, in that order, always from a single
//! writer task. Adapters therefore never need to synchronize against
//! themselves. Exactly one of [`Sink::end`] or [`Sink::cancel`] terminates a
//! run; `cancel` compensates whatever the adapter already persisted.

pub mod config;
mod csv_sink;
pub mod error;
mod influx;
mod json;
mod line_protocol;
mod noop;

pub use config::{CsvSettings, InfluxSettings, JsonSettings, SinkSettings};
pub use csv_sink::CsvSink;
pub use error::Error;
pub use influx::InfluxSink;
pub use json::JsonSink;
pub use noop::NoopSink;

use async_trait::async_trait;
use rigstream_model::{Alarm, Experiment, Measure, Sample};
use std::str::FromStr;

/// Destination of one ingested run.
///
/// All operations are invoked from a single task; ordering follows the
/// stream (`save_experiment`, then `save_measures`, then sample batches in
/// source order, with alarms interleaved independently). Per-call durability
/// is not required, only visibility of everything by `end`.
#[async_trait]
pub trait Sink: Send {
    /// Persists the experiment descriptor; may assign `experiment.id`.
    async fn save_experiment(&mut self, experiment: &mut Experiment) -> Result<(), Error>;

    /// Persists the measure schema. Called at most once per run.
    async fn save_measures(&mut self, measures: &[Measure]) -> Result<(), Error>;

    /// Persists one batch of samples.
    async fn save_samples(&mut self, samples: &[Sample]) -> Result<(), Error>;

    /// Persists one batch of alarms.
    async fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), Error>;

    /// Compensates partially-persisted state for this run. Idempotent.
    async fn cancel(&mut self) -> Result<(), Error>;

    /// Finalizes the run. Mutually exclusive with [`Sink::cancel`].
    async fn end(&mut self) -> Result<(), Error>;
}

/// The sink adapters an upload can select by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Discard everything.
    None,
    /// Single CSV file of resolved samples.
    Csv,
    /// One JSON dump file per measure.
    Json,
    /// Line-protocol time-series backend.
    Influx,
}

impl FromStr for SinkKind {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "none" => Ok(SinkKind::None),
            "csv" => Ok(SinkKind::Csv),
            "json" => Ok(SinkKind::Json),
            "influx" => Ok(SinkKind::Influx),
            _ => Err(Error::UnknownKind {
                key: key.to_owned(),
            }),
        }
    }
}

/// Builds the adapter selected by `key`.
///
/// The influx adapter pings its backend here, so an unreachable backend
/// fails the upload before any parsing starts.
pub async fn build(key: &str, settings: &SinkSettings) -> Result<Box<dyn Sink>, Error> {
    match SinkKind::from_str(key)? {
        SinkKind::None => Ok(Box::new(NoopSink)),
        SinkKind::Csv => Ok(Box::new(CsvSink::create(&settings.csv)?)),
        SinkKind::Json => Ok(Box::new(JsonSink::new(&settings.json))),
        SinkKind::Influx => Ok(Box::new(InfluxSink::connect(&settings.influx).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_kinds() {
        assert_eq!(SinkKind::from_str("none").unwrap(), SinkKind::None);
        assert_eq!(SinkKind::from_str("csv").unwrap(), SinkKind::Csv);
        assert_eq!(SinkKind::from_str("json").unwrap(), SinkKind::Json);
        assert_eq!(SinkKind::from_str("influx").unwrap(), SinkKind::Influx);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!(
            SinkKind::from_str("parquet"),
            Err(Error::UnknownKind { .. })
        ));
    }
}
