// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The ingestion pipeline.
//!
//! One upload becomes one [`Pipeline`]: a synchronous pre-ingest phase
//! (header, dates, experiment persistence), then two producer tasks feeding
//! parsed batches through a bounded queue into a single writer task that
//! owns the sink. A shared [`CancellationToken`] is the only shutdown
//! protocol; whichever task sees an error signals it, and the writer drains
//! the queue and compensates the sink.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod batch;
pub mod error;
mod pipeline;
mod reporter;
pub mod testing;

pub use batch::Batch;
pub use error::Error;
pub use pipeline::{Pipeline, PipelineSettings};
pub use reporter::{ReportHub, Reporter};
