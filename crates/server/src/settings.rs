// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Server settings, loadable from a YAML file.

use crate::error::Error;
use rigstream_engine::PipelineSettings;
use rigstream_sink::SinkSettings;
use serde::Deserialize;
use std::path::Path;

/// Root settings of the ingestion server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// HTTP listener settings.
    pub http: HttpSettings,
    /// Pipeline tuning knobs.
    pub pipeline: PipelineSettings,
    /// Per-adapter sink settings.
    pub sinks: SinkSettings,
}

/// Settings of the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    /// Address the listener binds to.
    pub bind_address: String,
    /// Upper bound on the whole multipart upload body, in bytes.
    pub max_upload_bytes: usize,
    /// Buffered report capacity per subscription channel.
    pub report_channel_capacity: usize,
    /// Seconds an unclaimed report channel outlives its finished run.
    pub events_grace_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            bind_address: "127.0.0.1:8393".to_owned(),
            max_upload_bytes: 256 * 1024 * 1024,
            report_channel_capacity: 64,
            events_grace_secs: 30,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.http.bind_address, "127.0.0.1:8393");
        assert_eq!(settings.pipeline.batch_size, 500);
        assert_eq!(settings.pipeline.queue_capacity, 10);
        assert_eq!(settings.http.report_channel_capacity, 64);
    }

    #[test]
    fn loads_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "http:\n  bind_address: 0.0.0.0:9000\npipeline:\n  batch_size: 50\nsinks:\n  influx:\n    database: other_db\n"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.http.bind_address, "0.0.0.0:9000");
        assert_eq!(settings.pipeline.batch_size, 50);
        // Untouched fields keep their defaults.
        assert_eq!(settings.pipeline.queue_capacity, 10);
        assert_eq!(settings.sinks.influx.database, "other_db");
        assert_eq!(settings.sinks.influx.url, "http://127.0.0.1:8086");
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "htpp:\n  bind_address: 0.0.0.0:9000\n").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(Error::Settings { .. })
        ));
    }
}
