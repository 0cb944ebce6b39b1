// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! CSV file sink.
//!
//! Every sample becomes one row `resolved time, measure name, type, unit,
//! value`, with the time of day resolved against the experiment start date.
//! Alarms are accepted and ignored. Cancelling removes the file.

use crate::Sink;
use crate::config::CsvSettings;
use crate::error::Error;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rigstream_model::{Alarm, Experiment, Measure, Sample};
use rigstream_parser::time::parse_time_of_day;
use std::fs::File;
use std::path::PathBuf;

/// Sink writing all samples of a run into a single CSV file.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    start_date: Option<DateTime<Utc>>,
    measures: Vec<Measure>,
}

impl CsvSink {
    /// Creates the output file, truncating a previous run's leftovers.
    pub fn create(settings: &CsvSettings) -> Result<Self, Error> {
        if let Some(parent) = settings.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&settings.path)?;
        Ok(CsvSink {
            path: settings.path.clone(),
            writer: Some(csv::Writer::from_writer(file)),
            start_date: None,
            measures: Vec::new(),
        })
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn save_experiment(&mut self, experiment: &mut Experiment) -> Result<(), Error> {
        self.start_date = experiment.start_date;
        Ok(())
    }

    async fn save_measures(&mut self, measures: &[Measure]) -> Result<(), Error> {
        self.measures = measures.to_vec();
        Ok(())
    }

    async fn save_samples(&mut self, samples: &[Sample]) -> Result<(), Error> {
        let start = self.start_date.ok_or(Error::MissingExperiment)?;
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::MissingExperiment);
        };
        for sample in samples {
            let measure = self
                .measures
                .get(sample.measure_index)
                .ok_or(Error::UnknownMeasure {
                    index: sample.measure_index,
                    count: self.measures.len(),
                })?;
            let time = parse_time_of_day(&sample.time_of_day, start)?;
            writer.write_record([
                time.to_rfc3339_opts(SecondsFormat::Nanos, true).as_str(),
                measure.name.as_str(),
                measure.kind.as_str(),
                measure.unit.as_str(),
                sample.value.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    async fn save_alarms(&mut self, _alarms: &[Alarm]) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), Error> {
        drop(self.writer.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn end(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigstream_parser::time::parse_date;
    use tempfile::tempdir;

    fn experiment() -> Experiment {
        Experiment {
            start_date: Some(parse_date("2020-01-01T10:00:00.000").unwrap()),
            end_date: Some(parse_date("2020-01-01T11:00:00.000").unwrap()),
            reference: "r".into(),
            name: "n".into(),
            bench: "b".into(),
            campaign: "c".into(),
            ..Experiment::default()
        }
    }

    fn schema() -> Vec<Measure> {
        vec![Measure {
            index: 0,
            name: "temp".into(),
            kind: "int".into(),
            unit: "C".into(),
        }]
    }

    #[tokio::test]
    async fn writes_resolved_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let mut sink = CsvSink::create(&CsvSettings { path: path.clone() }).unwrap();

        sink.save_experiment(&mut experiment()).await.unwrap();
        sink.save_measures(&schema()).await.unwrap();
        sink.save_samples(&[Sample {
            measure_index: 0,
            time_of_day: "10:00:01.000".into(),
            value: "42".into(),
        }])
        .await
        .unwrap();
        sink.end().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2020-01-01T10:00:01.000000000Z,temp,int,C,42\n");
    }

    #[tokio::test]
    async fn rejects_sample_outside_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let mut sink = CsvSink::create(&CsvSettings { path }).unwrap();
        sink.save_experiment(&mut experiment()).await.unwrap();
        sink.save_measures(&schema()).await.unwrap();

        let err = sink
            .save_samples(&[Sample {
                measure_index: 3,
                time_of_day: "10:00:01.000".into(),
                value: "42".into(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownMeasure { index: 3, count: 1 }
        ));
    }

    #[tokio::test]
    async fn cancel_removes_the_file_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let mut sink = CsvSink::create(&CsvSettings { path: path.clone() }).unwrap();
        assert!(path.exists());

        sink.cancel().await.unwrap();
        assert!(!path.exists());
        sink.cancel().await.unwrap();
    }
}
