// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The fan-out/fan-in orchestrator.
//!
//! Pre-ingest runs synchronously in the caller's task so that a broken
//! header or an unreachable sink surfaces in the upload response. After
//! that, one producer per stream parses batches into a bounded queue and a
//! single writer drives the sink. The writer owns the queue's shutdown;
//! producers only ever stop on their own, when the stream ends, an enqueue
//! fails, or the cancellation token fires.

use crate::batch::Batch;
use crate::error::Error;
use crate::reporter::{ReportHub, Reporter};
use rigstream_model::{Experiment, ReportKind, Step};
use rigstream_parser::time::parse_date;
use rigstream_parser::{AlarmsParser, SamplesParser};
use rigstream_sink::Sink;
use serde::Deserialize;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tuning knobs of the pipeline. The defaults match the acquisition sizes
/// this server was built around; both are safe to override.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Sample lines parsed per batch.
    pub batch_size: usize,
    /// Capacity of the batch queue between producers and writer.
    pub queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            batch_size: 500,
            queue_capacity: 10,
        }
    }
}

/// One upload's ingestion run.
pub struct Pipeline<S, A> {
    sink: Box<dyn Sink>,
    samples: SamplesParser<S>,
    alarms: Option<AlarmsParser<A>>,
    hub: ReportHub,
    cancel: CancellationToken,
    settings: PipelineSettings,
}

impl<S, A> Pipeline<S, A>
where
    S: AsyncBufRead + Unpin + Send + 'static,
    A: AsyncBufRead + Unpin + Send + 'static,
{
    /// Assembles a pipeline over the two uploaded streams.
    #[must_use]
    pub fn new(
        sink: Box<dyn Sink>,
        samples: S,
        alarms: Option<A>,
        hub: ReportHub,
        cancel: CancellationToken,
        settings: PipelineSettings,
    ) -> Self {
        Pipeline {
            sink,
            samples: SamplesParser::new(samples),
            alarms: alarms.map(AlarmsParser::new),
            hub,
            cancel,
            settings,
        }
    }

    /// Runs pre-ingest, then spawns the producer and writer tasks.
    ///
    /// On success the experiment carries its sink-assigned id and parsed
    /// dates, and the returned handle resolves when the writer has called
    /// `end` or `cancel` on the sink. On failure nothing was spawned, the
    /// sink has been compensated and the failure is recorded on `reporter`.
    pub async fn start(
        mut self,
        experiment: &mut Experiment,
        reporter: &mut Reporter,
    ) -> Result<JoinHandle<()>, Error> {
        if let Err(e) = self.pre_ingest(experiment, reporter).await {
            let compensation = self.sink.cancel().await;
            match compensation {
                Ok(()) => reporter.success(Step::Cancel),
                Err(cancel_err) => reporter.failure(Step::Cancel, &cancel_err),
            }
            return Err(e);
        }

        let (tx, rx) = mpsc::channel(self.settings.queue_capacity);
        let producers = 1 + usize::from(self.alarms.is_some());

        let samples_task = samples_producer(
            self.samples,
            tx.clone(),
            self.hub.reporter(ReportKind::Samples),
            self.cancel.clone(),
            self.settings.batch_size,
        );
        let _ = tokio::spawn(samples_task);

        if let Some(alarms) = self.alarms {
            let alarms_task = alarms_producer(
                alarms,
                tx.clone(),
                self.hub.reporter(ReportKind::Alarms),
                self.cancel.clone(),
            );
            let _ = tokio::spawn(alarms_task);
        }
        drop(tx);

        let writer = Writer {
            sink: self.sink,
            samples_reporter: self.hub.reporter(ReportKind::Samples),
            alarms_reporter: self.hub.reporter(ReportKind::Alarms),
            client_reporter: self.hub.reporter(ReportKind::Client),
            cancel: self.cancel,
            expected_ends: producers,
        };
        Ok(tokio::spawn(writer.run(rx)))
    }

    /// Parses the header dates and persists the experiment descriptor.
    async fn pre_ingest(
        &mut self,
        experiment: &mut Experiment,
        reporter: &mut Reporter,
    ) -> Result<(), Error> {
        let header = match self.samples.parse_header().await {
            Ok((header, read)) => {
                reporter.add_read(read);
                reporter.success(Step::ParseHeader);
                header
            }
            Err(e) => {
                reporter.failure(Step::ParseHeader, &e);
                return Err(e.into());
            }
        };

        match parse_date(&header.start_date) {
            Ok(start) => {
                experiment.start_date = Some(start);
                reporter.success(Step::ParseStartDate);
            }
            Err(e) => {
                reporter.failure(Step::ParseStartDate, &e);
                return Err(e.into());
            }
        }

        match parse_date(&header.end_date) {
            Ok(end) => {
                experiment.end_date = Some(end);
                reporter.success(Step::ParseEndDate);
            }
            Err(e) => {
                reporter.failure(Step::ParseEndDate, &e);
                return Err(e.into());
            }
        }

        match self.sink.save_experiment(experiment).await {
            Ok(()) => {
                reporter.set_experiment_id(&experiment.id);
                reporter.success(Step::SaveExperiment);
                Ok(())
            }
            Err(e) => {
                reporter.failure(Step::SaveExperiment, &e);
                Err(e.into())
            }
        }
    }
}

/// Parses the measure schema, then sample batches, into the queue.
async fn samples_producer<S: AsyncBufRead + Unpin>(
    mut parser: SamplesParser<S>,
    tx: mpsc::Sender<Batch>,
    mut reporter: Reporter,
    cancel: CancellationToken,
    batch_size: usize,
) {
    if cancel.is_cancelled() {
        return;
    }
    match parser.parse_measures().await {
        Ok((measures, read)) => {
            reporter.add_read(read);
            reporter.success(Step::ParseMeasures);
            if tx.send(Batch::Measures(measures)).await.is_err() {
                return;
            }
        }
        Err(e) => {
            reporter.failure(Step::ParseMeasures, &e);
            cancel.cancel();
            return;
        }
    }

    let mut ordinal: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        ordinal += 1;
        match parser.parse_samples(batch_size).await {
            Ok((samples, read, end)) => {
                reporter.add_read(read);
                reporter.success(Step::ParseSamples(ordinal));
                if !samples.is_empty()
                    && tx.send(Batch::Samples { ordinal, samples }).await.is_err()
                {
                    return;
                }
                if end {
                    let _ = tx.send(Batch::End).await;
                    return;
                }
            }
            Err(e) => {
                reporter.failure(Step::ParseSamples(ordinal), &e);
                cancel.cancel();
                return;
            }
        }
    }
}

/// Parses the whole alarms log into the queue.
async fn alarms_producer<A: AsyncBufRead + Unpin>(
    mut parser: AlarmsParser<A>,
    tx: mpsc::Sender<Batch>,
    mut reporter: Reporter,
    cancel: CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    match parser.parse_alarms().await {
        Ok((alarms, read)) => {
            reporter.add_read(read);
            reporter.success(Step::ParseAlarms);
            if tx.send(Batch::Alarms(alarms)).await.is_err() {
                return;
            }
            let _ = tx.send(Batch::End).await;
        }
        Err(e) => {
            reporter.failure(Step::ParseAlarms, &e);
            cancel.cancel();
        }
    }
}

/// The single consumer of the batch queue, sole owner of the sink.
struct Writer {
    sink: Box<dyn Sink>,
    samples_reporter: Reporter,
    alarms_reporter: Reporter,
    client_reporter: Reporter,
    cancel: CancellationToken,
    expected_ends: usize,
}

impl Writer {
    async fn run(mut self, mut rx: mpsc::Receiver<Batch>) {
        let failing = self.consume(&mut rx).await;
        if failing {
            // Drain whatever the producers enqueued before they noticed the
            // cancellation, then compensate.
            rx.close();
            while rx.recv().await.is_some() {}
            let compensation = self.sink.cancel().await.map_err(|e| e.to_string());
            if let Err(ref e) = compensation {
                tracing::error!(error = %e, "compensation failed");
            }
            self.client_reporter.terminal_failure(compensation);
        } else {
            match self.sink.end().await {
                Ok(()) => self.client_reporter.terminal_success(),
                Err(e) => {
                    // `end` is terminal like `cancel`: the sink is released
                    // either way, so a failed finalize is not re-compensated.
                    self.client_reporter.failure(Step::End, &e);
                }
            }
        }
    }

    /// Returns `true` when the run must be compensated.
    async fn consume(&mut self, rx: &mut mpsc::Receiver<Batch>) -> bool {
        let mut ends = 0;
        loop {
            let batch = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return true,
                batch = rx.recv() => batch,
            };
            match batch {
                // All senders dropped without the expected end markers; only
                // reachable when a producer bailed out after cancellation.
                None => return true,
                Some(Batch::Measures(measures)) => {
                    match self.sink.save_measures(&measures).await {
                        Ok(()) => self.samples_reporter.success(Step::SaveMeasures),
                        Err(e) => {
                            self.samples_reporter.failure(Step::SaveMeasures, &e);
                            self.cancel.cancel();
                            return true;
                        }
                    }
                }
                Some(Batch::Samples { ordinal, samples }) => {
                    match self.sink.save_samples(&samples).await {
                        Ok(()) => self.samples_reporter.success(Step::SaveSamples(ordinal)),
                        Err(e) => {
                            self.samples_reporter.failure(Step::SaveSamples(ordinal), &e);
                            self.cancel.cancel();
                            return true;
                        }
                    }
                }
                Some(Batch::Alarms(alarms)) => match self.sink.save_alarms(&alarms).await {
                    Ok(()) => self.alarms_reporter.success(Step::SaveAlarms),
                    Err(e) => {
                        self.alarms_reporter.failure(Step::SaveAlarms, &e);
                        self.cancel.cancel();
                        return true;
                    }
                },
                Some(Batch::End) => {
                    ends += 1;
                    if ends == self.expected_ends {
                        return false;
                    }
                }
            }
        }
    }
}
