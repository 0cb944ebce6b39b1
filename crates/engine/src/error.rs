// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the pipeline orchestrator.

use thiserror::Error;

/// Errors surfaced to the caller by the synchronous pre-ingest phase.
///
/// Failures inside the spawned tasks never reach the caller directly; they
/// travel through failure reports and the cancellation token instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The samples header or one of its dates could not be parsed.
    #[error(transparent)]
    Parse(#[from] rigstream_parser::Error),

    /// The sink rejected the experiment descriptor.
    #[error(transparent)]
    Sink(#[from] rigstream_sink::Error),
}
