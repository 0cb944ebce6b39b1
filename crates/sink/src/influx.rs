// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Time-series backend sink, speaking Line Protocol over HTTP.
//!
//! Points land in four measurements: `experiments`, `measures`, `samples`
//! and `alarms`, all tagged with the experiment id so that compensation can
//! delete them again. Timestamps are written with millisecond precision;
//! the verbatim sub-second token of a time of day is taken as milliseconds
//! here, which is exactly the scaling this backend expects.

use crate::Sink;
use crate::config::InfluxSettings;
use crate::error::Error;
use crate::line_protocol::{FieldValue, encode_point};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rigstream_model::{Alarm, Experiment, Measure, Sample};
use rigstream_parser::time::parse_time_of_day;
use uuid::Uuid;

/// Millisecond timestamp precision, for both writes and deletes.
const PRECISION: &str = "ms";

/// Sink writing into an InfluxDB-compatible backend.
pub struct InfluxSink {
    http: reqwest::Client,
    settings: InfluxSettings,
    experiment_id: String,
    measure_ids: Vec<String>,
    start_date: Option<DateTime<Utc>>,
}

impl InfluxSink {
    /// Builds the sink and pings the backend once, so an unreachable
    /// backend fails the upload before any parsing starts.
    pub async fn connect(settings: &InfluxSettings) -> Result<Self, Error> {
        let sink = InfluxSink {
            http: reqwest::Client::new(),
            settings: settings.clone(),
            experiment_id: String::new(),
            measure_ids: Vec::new(),
            start_date: None,
        };
        sink.ping().await?;
        Ok(sink)
    }

    async fn ping(&self) -> Result<(), Error> {
        let url = format!("{}/ping", self.settings.url);
        let response = self.http.get(&url).send().await?;
        check(response).await
    }

    async fn write(&self, lines: String) -> Result<(), Error> {
        let url = format!("{}/write", self.settings.url);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("db", self.settings.database.as_str()),
                ("precision", PRECISION),
            ])
            .body(lines)
            .send()
            .await?;
        check(response).await
    }

    async fn query(&self, statement: &str) -> Result<(), Error> {
        let url = format!("{}/query", self.settings.url);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("db", self.settings.database.as_str()),
                ("q", statement),
            ])
            .send()
            .await?;
        check(response).await
    }

    /// Resolves a time of day to epoch milliseconds against the experiment
    /// start date, scaling the verbatim sub-second token to milliseconds.
    fn resolve_millis(&self, time_of_day: &str) -> Result<i64, Error> {
        let start = self.start_date.ok_or(Error::MissingExperiment)?;
        let resolved = parse_time_of_day(time_of_day, start)?;
        Ok(resolved.timestamp() * 1_000 + i64::from(resolved.timestamp_subsec_nanos()))
    }
}

async fn check(response: reqwest::Response) -> Result<(), Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(Error::Backend {
        status: status.as_u16(),
        details: response.text().await.unwrap_or_default(),
    })
}

#[async_trait]
impl Sink for InfluxSink {
    async fn save_experiment(&mut self, experiment: &mut Experiment) -> Result<(), Error> {
        let id = Uuid::new_v4().to_string();
        let start = experiment.start_date.ok_or(Error::MissingExperiment)?;
        let end = experiment.end_date.ok_or(Error::MissingExperiment)?;
        let line = encode_point(
            "experiments",
            &[("id", &id)],
            &[
                ("reference", FieldValue::String(experiment.reference.clone())),
                ("name", FieldValue::String(experiment.name.clone())),
                ("bench", FieldValue::String(experiment.bench.clone())),
                ("campaign", FieldValue::String(experiment.campaign.clone())),
                (
                    "startDate",
                    FieldValue::String(start.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ),
                (
                    "endDate",
                    FieldValue::String(end.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ),
            ],
            start.timestamp_millis(),
        );
        self.write(line).await?;
        self.start_date = Some(start);
        self.experiment_id = id.clone();
        experiment.id = id;
        Ok(())
    }

    async fn save_measures(&mut self, measures: &[Measure]) -> Result<(), Error> {
        if self.experiment_id.is_empty() {
            return Err(Error::MissingExperiment);
        }
        let now = Utc::now().timestamp_millis();
        let mut ids = Vec::with_capacity(measures.len());
        let mut lines = Vec::with_capacity(measures.len());
        for measure in measures {
            let id = Uuid::new_v4().to_string();
            lines.push(encode_point(
                "measures",
                &[("id", &id), ("experimentID", &self.experiment_id)],
                &[
                    ("name", FieldValue::String(measure.name.clone())),
                    ("type", FieldValue::String(measure.kind.clone())),
                    ("unit", FieldValue::String(measure.unit.clone())),
                ],
                now,
            ));
            ids.push(id);
        }
        if !lines.is_empty() {
            self.write(lines.join("\n")).await?;
        }
        self.measure_ids = ids;
        Ok(())
    }

    async fn save_samples(&mut self, samples: &[Sample]) -> Result<(), Error> {
        let mut lines = Vec::with_capacity(samples.len());
        for sample in samples {
            let measure_id =
                self.measure_ids
                    .get(sample.measure_index)
                    .ok_or(Error::UnknownMeasure {
                        index: sample.measure_index,
                        count: self.measure_ids.len(),
                    })?;
            lines.push(encode_point(
                "samples",
                &[
                    ("experimentID", &self.experiment_id),
                    ("measureID", measure_id),
                ],
                &[("value", FieldValue::String(sample.value.clone()))],
                self.resolve_millis(&sample.time_of_day)?,
            ));
        }
        if lines.is_empty() {
            return Ok(());
        }
        self.write(lines.join("\n")).await
    }

    async fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), Error> {
        if self.experiment_id.is_empty() {
            return Err(Error::MissingExperiment);
        }
        let mut lines = Vec::with_capacity(alarms.len());
        for alarm in alarms {
            lines.push(encode_point(
                "alarms",
                &[("experimentID", &self.experiment_id)],
                &[
                    ("level", FieldValue::Integer(alarm.level)),
                    ("message", FieldValue::String(alarm.message.clone())),
                ],
                self.resolve_millis(&alarm.time_of_day)?,
            ));
        }
        if lines.is_empty() {
            return Ok(());
        }
        self.write(lines.join("\n")).await
    }

    async fn cancel(&mut self) -> Result<(), Error> {
        if self.experiment_id.is_empty() {
            return Ok(());
        }
        for measurement in ["experiments", "measures", "samples", "alarms"] {
            let column = if measurement == "experiments" {
                "id"
            } else {
                "experimentID"
            };
            let statement = format!(
                "DELETE FROM {measurement} WHERE \"{column}\"='{}'",
                self.experiment_id
            );
            self.query(&statement).await?;
        }
        self.experiment_id.clear();
        Ok(())
    }

    async fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigstream_parser::time::parse_date;

    fn sink_with_start(start: &str) -> InfluxSink {
        InfluxSink {
            http: reqwest::Client::new(),
            settings: InfluxSettings::default(),
            experiment_id: "exp-1".into(),
            measure_ids: vec!["m-0".into()],
            start_date: Some(parse_date(start).unwrap()),
        }
    }

    #[test]
    fn resolves_sub_second_token_as_milliseconds() {
        let sink = sink_with_start("2020-01-01T10:00:00.000");
        // 2020-01-01T10:00:00 UTC = 1577872800 s.
        assert_eq!(
            sink.resolve_millis("10:00:00.500").unwrap(),
            1_577_872_800_000 + 500
        );
        assert_eq!(
            sink.resolve_millis("05:30.250").unwrap(),
            1_577_872_800_000 + 5 * 60_000 + 30_000 + 250
        );
    }

    #[test]
    fn resolve_requires_a_saved_experiment() {
        let mut sink = sink_with_start("2020-01-01T10:00:00.000");
        sink.start_date = None;
        assert!(matches!(
            sink.resolve_millis("10:00:00.500"),
            Err(Error::MissingExperiment)
        ));
    }
}
