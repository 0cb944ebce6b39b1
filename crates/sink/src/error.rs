// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the sink adapters.

use thiserror::Error;

/// Errors raised while persisting telemetry.
#[derive(Error, Debug)]
pub enum Error {
    /// No adapter is registered under the requested key.
    #[error("no sink associated with '{key}'")]
    UnknownKind {
        /// The key received from the upload form.
        key: String,
    },

    /// A sample referenced a measure outside the saved schema.
    #[error("sample measure index {index} outside schema of {count} measures")]
    UnknownMeasure {
        /// The offending measure index.
        index: usize,
        /// Number of measures in the saved schema.
        count: usize,
    },

    /// A batch arrived before the experiment descriptor was saved.
    #[error("experiment not saved yet")]
    MissingExperiment,

    /// A time of day could not be resolved against the experiment start.
    #[error(transparent)]
    Time(#[from] rigstream_parser::Error),

    /// Local file I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV encoding failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// JSON encoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A background flush task was cancelled or panicked.
    #[error("flush worker failed: {0}")]
    FlushWorker(#[from] tokio::task::JoinError),

    /// The time-series backend could not be reached.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The time-series backend rejected a request.
    #[error("backend returned {status}: {details}")]
    Backend {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, if any.
        details: String,
    },
}
