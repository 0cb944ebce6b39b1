// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! JSON-per-measure dump sink.
//!
//! One `<index>.json` file per measure, shaped
//! `{"measure":..,"type":..,"unit":..,"values":[{"time":..,"value":..},..]}`.
//! Samples are buffered per measure and appended by background workers once
//! a buffer crosses the flush threshold; `end` waits for the workers and
//! closes the JSON arrays. The worker pool is an adapter detail; the
//! orchestrator still sees the ordinary single-caller contract.

use crate::Sink;
use crate::config::JsonSettings;
use crate::error::Error;
use async_trait::async_trait;
use parking_lot::Mutex;
use rigstream_model::{Alarm, Experiment, Measure, Sample};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::task::JoinSet;

#[derive(Serialize)]
struct ValueEntry<'a> {
    time: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct FilePrologue<'a> {
    measure: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    unit: &'a str,
}

/// Sink dumping each measure's values into its own JSON file.
pub struct JsonSink {
    dir: PathBuf,
    flush_threshold: usize,
    measure_count: usize,
    buffers: HashMap<usize, Vec<u8>>,
    /// Measures with an append currently in flight; a second flush for the
    /// same file would race it and reorder values.
    in_flight: Arc<Mutex<HashSet<usize>>>,
    workers: JoinSet<Result<(), Error>>,
}

impl JsonSink {
    /// Prepares a sink dumping into `settings.dir`.
    #[must_use]
    pub fn new(settings: &JsonSettings) -> Self {
        JsonSink {
            dir: settings.dir.clone(),
            flush_threshold: settings.flush_threshold,
            measure_count: 0,
            buffers: HashMap::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            workers: JoinSet::new(),
        }
    }

    fn file_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("{index}.json"))
    }

    fn spawn_flush(&mut self, index: usize, bytes: Vec<u8>) {
        let path = Self::file_path(&self.dir, index);
        let in_flight = Arc::clone(&self.in_flight);
        let _ = in_flight.lock().insert(index);
        let _ = self.workers.spawn(async move {
            let result = append(&path, &bytes).await;
            let _ = in_flight.lock().remove(&index);
            result
        });
    }

    async fn drain_workers(&mut self) -> Result<(), Error> {
        while let Some(joined) = self.workers.join_next().await {
            joined??;
        }
        Ok(())
    }
}

async fn append(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    Ok(())
}

/// Overwrites the trailing comma (when present) with `]}`, closing the
/// values array the prologue opened.
async fn close_array(path: &Path) -> Result<(), Error> {
    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .await?;
    let len = file.metadata().await?.len();
    let mut offset = len;
    if len > 0 {
        let _ = file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        let _ = file.read_exact(&mut last).await?;
        if last[0] == b',' {
            offset = len - 1;
        }
    }
    let _ = file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(b"]}").await?;
    file.set_len(offset + 2).await?;
    Ok(())
}

#[async_trait]
impl Sink for JsonSink {
    async fn save_experiment(&mut self, _experiment: &mut Experiment) -> Result<(), Error> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn save_measures(&mut self, measures: &[Measure]) -> Result<(), Error> {
        for measure in measures {
            let mut prologue = serde_json::to_vec(&FilePrologue {
                measure: &measure.name,
                kind: &measure.kind,
                unit: &measure.unit,
            })?;
            // Reopen the object: swap the closing brace for the values array.
            let _ = prologue.pop();
            prologue.extend_from_slice(b",\"values\":[");
            tokio::fs::write(Self::file_path(&self.dir, measure.index), prologue).await?;
            let _ = self.buffers.insert(measure.index, Vec::new());
        }
        self.measure_count = measures.len();
        Ok(())
    }

    async fn save_samples(&mut self, samples: &[Sample]) -> Result<(), Error> {
        for sample in samples {
            if sample.measure_index >= self.measure_count {
                return Err(Error::UnknownMeasure {
                    index: sample.measure_index,
                    count: self.measure_count,
                });
            }
            let buffer = self
                .buffers
                .get_mut(&sample.measure_index)
                .ok_or(Error::MissingExperiment)?;
            let entry = serde_json::to_vec(&ValueEntry {
                time: &sample.time_of_day,
                value: &sample.value,
            })?;
            buffer.extend_from_slice(&entry);
            buffer.push(b',');
        }

        let ready: Vec<usize> = {
            let in_flight = self.in_flight.lock();
            self.buffers
                .iter()
                .filter(|(index, buffer)| {
                    buffer.len() > self.flush_threshold && !in_flight.contains(index)
                })
                .map(|(index, _)| *index)
                .collect()
        };
        for index in ready {
            if let Some(buffer) = self.buffers.get_mut(&index) {
                let bytes = std::mem::take(buffer);
                self.spawn_flush(index, bytes);
            }
        }
        Ok(())
    }

    async fn save_alarms(&mut self, _alarms: &[Alarm]) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), Error> {
        self.workers.shutdown().await;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn end(&mut self) -> Result<(), Error> {
        self.drain_workers().await?;
        for (index, buffer) in std::mem::take(&mut self.buffers) {
            if !buffer.is_empty() {
                append(&Self::file_path(&self.dir, index), &buffer).await?;
            }
        }
        for index in 0..self.measure_count {
            close_array(&Self::file_path(&self.dir, index)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn schema() -> Vec<Measure> {
        vec![
            Measure {
                index: 0,
                name: "temp".into(),
                kind: "int".into(),
                unit: "C".into(),
            },
            Measure {
                index: 1,
                name: "pressure".into(),
                kind: "float".into(),
                unit: "bar".into(),
            },
        ]
    }

    fn sample(index: usize, time: &str, value: &str) -> Sample {
        Sample {
            measure_index: index,
            time_of_day: time.into(),
            value: value.into(),
        }
    }

    async fn sink_in(dir: &Path) -> JsonSink {
        let mut sink = JsonSink::new(&JsonSettings {
            dir: dir.to_path_buf(),
            flush_threshold: 16,
        });
        sink.save_experiment(&mut Experiment::default())
            .await
            .unwrap();
        sink.save_measures(&schema()).await.unwrap();
        sink
    }

    #[tokio::test]
    async fn dumps_one_valid_json_file_per_measure() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        let mut sink = sink_in(&dir).await;

        sink.save_samples(&[
            sample(0, "10:00:00.000", "1"),
            sample(1, "10:00:00.000", "2"),
            sample(0, "10:00:01.000", "3"),
        ])
        .await
        .unwrap();
        sink.end().await.unwrap();

        let parsed: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("0.json")).unwrap()).unwrap();
        assert_eq!(parsed["measure"], "temp");
        assert_eq!(parsed["type"], "int");
        assert_eq!(parsed["values"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["values"][1]["value"], "3");

        let parsed: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("1.json")).unwrap()).unwrap();
        assert_eq!(parsed["values"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_measure_closes_as_empty_array() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        let mut sink = sink_in(&dir).await;
        sink.end().await.unwrap();

        let parsed: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("1.json")).unwrap()).unwrap();
        assert_eq!(parsed["values"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn background_flushes_keep_files_well_formed() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        let mut sink = sink_in(&dir).await;

        // Far past the 16-byte threshold, forcing several worker flushes.
        for batch in 0..10 {
            let samples: Vec<Sample> = (0..20)
                .map(|i| sample(0, "10:00:00.000", &format!("{batch}-{i}")))
                .collect();
            sink.save_samples(&samples).await.unwrap();
        }
        sink.end().await.unwrap();

        let parsed: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("0.json")).unwrap()).unwrap();
        assert_eq!(parsed["values"].as_array().unwrap().len(), 200);
        assert_eq!(parsed["values"][0]["value"], "0-0");
        assert_eq!(parsed["values"][199]["value"], "9-19");
    }

    #[tokio::test]
    async fn rejects_sample_outside_schema() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        let mut sink = sink_in(&dir).await;
        let err = sink
            .save_samples(&[sample(7, "10:00:00.000", "1")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownMeasure { index: 7, count: 2 }
        ));
    }

    #[tokio::test]
    async fn cancel_removes_the_dump_directory_and_is_idempotent() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        let mut sink = sink_in(&dir).await;
        assert!(dir.exists());

        sink.cancel().await.unwrap();
        assert!(!dir.exists());
        sink.cancel().await.unwrap();
    }
}
