// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Streaming parsers for the two upload formats.
//!
//! Both parsers are single-pass readers over a buffered byte stream with no
//! look-ahead beyond one line. They keep a running count of the raw bytes
//! consumed so the caller can report progress against the upload size.

mod alarms;
pub mod error;
mod line;
mod samples;
pub mod time;

pub use alarms::AlarmsParser;
pub use error::Error;
pub use line::LineScanner;
pub use samples::{Header, SamplesParser};
