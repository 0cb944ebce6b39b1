// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Messages flowing from the producer tasks to the writer.

use rigstream_model::{Alarm, Measure, Sample};

/// One message through the bounded batch queue.
///
/// Produced by a parser task, consumed exactly once by the writer. Sample
/// batches carry their 1-based ordinal so the writer can tag the matching
/// save step.
#[derive(Debug)]
pub enum Batch {
    /// The measure schema, enqueued strictly before any samples.
    Measures(Vec<Measure>),
    /// One batch of samples, in source order.
    Samples {
        /// 1-based ordinal of the batch within the stream.
        ordinal: u64,
        /// The parsed samples.
        samples: Vec<Sample>,
    },
    /// The whole alarms log.
    Alarms(Vec<Alarm>),
    /// A producer finished; the writer finalizes after the last one.
    End,
}
