// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The upload handler: validate, spool, prime the pipeline, respond.

use crate::AppState;
use crate::extract::{self, SpooledFile};
use axum::Json;
use axum::extract::{Multipart, State};
use rigstream_engine::{Pipeline, ReportHub};
use rigstream_model::{Experiment, Report, ReportKind, Step};
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Accepts a multipart upload and primes the ingestion pipeline.
///
/// The response is always a report snapshot: on success it carries the
/// subscription channel id and every step up to `7_SAVE_EXPERIMENT`; on
/// failure the failing step and, when the sink was already touched, the
/// compensation outcome.
pub(crate) async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Json<Report> {
    let channel_id = Uuid::new_v4().to_string();
    let mut bootstrap = Report::new(channel_id.clone());
    bootstrap.add_success(Step::Init);

    let spool = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            bootstrap.add_error(Step::InitImport, e.to_string());
            return Json(bootstrap);
        }
    };

    // Extraction phase: steps 2 and 3.x.
    let parts = match extract::collect(&mut multipart, &spool).await {
        Ok(parts) => parts,
        Err(e) => {
            bootstrap.add_error(e.step, e.message);
            return Json(bootstrap);
        }
    };

    let mut experiment = match parts.experiment.as_deref() {
        None => {
            bootstrap.add_error(Step::ExtractExperiment, "experiment info is required");
            return Json(bootstrap);
        }
        Some(raw) => match Experiment::from_json(raw) {
            Ok(experiment) => experiment,
            Err(e) => {
                bootstrap.add_error(Step::ExtractExperiment, e.to_string());
                return Json(bootstrap);
            }
        },
    };
    bootstrap.add_success(Step::ExtractExperiment);

    let Some(samples) = parts.samples else {
        bootstrap.add_error(Step::ExtractSamples, "samples file is required");
        return Json(bootstrap);
    };
    bootstrap.samples_size = samples.size;
    bootstrap.add_success(Step::ExtractSamples);

    if let Some(alarms) = &parts.alarms {
        bootstrap.has_alarms = true;
        bootstrap.alarms_size = alarms.size;
        bootstrap.add_success(Step::ExtractAlarms);
    }

    // Sink and stream setup: step 4.
    let Some(sink_key) = parts.sink.as_deref() else {
        bootstrap.add_error(Step::InitImport, "sink key is required");
        return Json(bootstrap);
    };
    let sink = match rigstream_sink::build(sink_key, &state.settings.sinks).await {
        Ok(sink) => sink,
        Err(e) => {
            bootstrap.add_error(Step::InitImport, e.to_string());
            return Json(bootstrap);
        }
    };

    let samples_reader = match open_spooled(&samples).await {
        Ok(reader) => reader,
        Err(e) => {
            bootstrap.add_error(Step::InitImport, e.to_string());
            return Json(bootstrap);
        }
    };
    let alarms_reader = match &parts.alarms {
        Some(alarms) => match open_spooled(alarms).await {
            Ok(reader) => Some(reader),
            Err(e) => {
                bootstrap.add_error(Step::InitImport, e.to_string());
                return Json(bootstrap);
            }
        },
        None => None,
    };
    bootstrap.add_success(Step::InitImport);

    let (hub, reports) = ReportHub::new(
        channel_id.clone(),
        state.settings.http.report_channel_capacity,
        samples.size,
        parts.alarms.as_ref().map(|a| a.size),
    );
    let mut reporter = hub.reporter(ReportKind::Experiment);
    reporter.absorb(&bootstrap);

    let pipeline = Pipeline::new(
        sink,
        samples_reader,
        alarms_reader,
        hub.clone(),
        CancellationToken::new(),
        state.settings.pipeline,
    );

    // Pre-ingest runs here, synchronously: steps 5 through 7.
    match pipeline.start(&mut experiment, &mut reporter).await {
        Ok(writer) => {
            let _ = state.channels.lock().insert(channel_id.clone(), reports);
            let channels = state.channels.clone();
            let grace = Duration::from_secs(state.settings.http.events_grace_secs);
            let _ = tokio::spawn(async move {
                // The spool directory must outlive both producers.
                let _spool = spool;
                if let Err(e) = writer.await {
                    tracing::error!(channel = %channel_id, "writer task failed: {e}");
                }
                tokio::time::sleep(grace).await;
                if channels.lock().remove(&channel_id).is_some() {
                    tracing::debug!(channel = %channel_id, "reaped unclaimed report channel");
                }
            });
        }
        Err(e) => {
            tracing::warn!(error = %e, "upload rejected during pre-ingest");
            // No channel is registered; the failure snapshot is the reply.
        }
    }

    Json(reporter.snapshot())
}

async fn open_spooled(file: &SpooledFile) -> std::io::Result<BufReader<tokio::fs::File>> {
    Ok(BufReader::new(tokio::fs::File::open(&file.path).await?))
}
