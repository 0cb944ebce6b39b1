// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Settings for the sink adapters.

use serde::Deserialize;
use std::path::PathBuf;

/// Settings for every adapter, keyed by sink kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkSettings {
    /// Time-series backend settings.
    pub influx: InfluxSettings,
    /// CSV file sink settings.
    pub csv: CsvSettings,
    /// JSON dump sink settings.
    pub json: JsonSettings,
}

/// Connection settings for the line-protocol time-series backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfluxSettings {
    /// Base URL of the backend.
    pub url: String,
    /// Database the points are written into.
    pub database: String,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        InfluxSettings {
            url: "http://127.0.0.1:8086".to_owned(),
            database: "rigstream_db".to_owned(),
        }
    }
}

/// Settings for the CSV file sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvSettings {
    /// Path of the output file.
    pub path: PathBuf,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            path: PathBuf::from("out/samples.csv"),
        }
    }
}

/// Settings for the JSON-per-measure dump sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonSettings {
    /// Directory holding one `<index>.json` file per measure.
    pub dir: PathBuf,
    /// Buffered bytes per measure before a background flush kicks in.
    pub flush_threshold: usize,
}

impl Default for JsonSettings {
    fn default() -> Self {
        JsonSettings {
            dir: PathBuf::from("dumps"),
            flush_threshold: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let settings = SinkSettings::default();
        assert_eq!(settings.influx.database, "rigstream_db");
        assert_eq!(settings.json.flush_threshold, 1000);
        assert!(settings.csv.path.ends_with("samples.csv"));
    }

    #[test]
    fn deserializes_partial_yaml_shaped_json() {
        let raw = r#"{"influx":{"url":"http://influx:8086"}}"#;
        let settings: SinkSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.influx.url, "http://influx:8086");
        assert_eq!(settings.influx.database, "rigstream_db");
    }
}
