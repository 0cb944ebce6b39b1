// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the streaming parsers.

use thiserror::Error;

/// Errors raised while parsing the samples or alarms streams.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying byte stream failed.
    #[error("error while reading: {0}")]
    Read(#[from] std::io::Error),

    /// The stream ended where a line was still required.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A line that must carry content was empty.
    #[error("empty content")]
    EmptyLine,

    /// A line carried fewer `;`-separated fields than required.
    #[error("expected at least {expected} fields, line has {actual}")]
    FieldCount {
        /// Minimum number of fields required.
        expected: usize,
        /// Number of fields found on the line.
        actual: usize,
    },

    /// A date string did not match the `YYYY-MM-DDTHH:MM:SS.mmm` pattern.
    #[error("invalid date '{value}': {details}")]
    InvalidDate {
        /// The raw date string.
        value: String,
        /// Human-readable details of the failure.
        details: String,
    },

    /// A time-of-day string did not split into 3 or 4 integer tokens.
    #[error("invalid time of day '{value}': {details}")]
    InvalidTimeOfDay {
        /// The raw time-of-day string.
        value: String,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The measure schema rows disagree in length.
    #[error("{row} length ({actual}) does not match measures length ({expected})")]
    SchemaLengthMismatch {
        /// Which schema row disagreed (`types` or `units`).
        row: &'static str,
        /// Number of measure names.
        expected: usize,
        /// Number of entries in the offending row.
        actual: usize,
    },

    /// An alarm line did not carry the `time;level;message` shape.
    #[error("badly formatted alarm line: {details}")]
    BadAlarmLine {
        /// Human-readable details of the failure.
        details: String,
    },

    /// An alarm level was not a valid integer.
    #[error("invalid alarm level '{value}'")]
    InvalidAlarmLevel {
        /// The raw level field.
        value: String,
    },
}
