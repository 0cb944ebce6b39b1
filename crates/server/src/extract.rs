// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Multipart form extraction.
//!
//! File parts are spooled into a per-upload temporary directory: the
//! parsers need cheap buffered re-readable streams, and spooling is the
//! only way to know each part's size before the pipeline starts reporting
//! progress against it.

use rigstream_model::Step;
use std::path::Path;
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// A file part written to the spool directory.
#[derive(Debug)]
pub(crate) struct SpooledFile {
    /// Path inside the spool directory.
    pub path: std::path::PathBuf,
    /// Size of the part in bytes.
    pub size: u64,
}

/// Everything the upload form may carry.
#[derive(Debug, Default)]
pub(crate) struct UploadParts {
    /// Raw JSON of the `experiment` field.
    pub experiment: Option<String>,
    /// Sink adapter key from the `sink` field.
    pub sink: Option<String>,
    /// Spooled samples file.
    pub samples: Option<SpooledFile>,
    /// Spooled alarms file.
    pub alarms: Option<SpooledFile>,
}

/// An extraction failure, attributed to the pipeline step it belongs to.
#[derive(Debug)]
pub(crate) struct ExtractError {
    /// The step the failure is reported under.
    pub step: Step,
    /// Human-readable message.
    pub message: String,
}

impl ExtractError {
    fn new(step: Step, message: impl ToString) -> Self {
        ExtractError {
            step,
            message: message.to_string(),
        }
    }
}

/// Walks the multipart stream and collects the known fields.
///
/// Unknown fields are drained and ignored. Fields may arrive in any order.
pub(crate) async fn collect(
    multipart: &mut axum::extract::Multipart,
    spool: &TempDir,
) -> Result<UploadParts, ExtractError> {
    let mut parts = UploadParts::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ExtractError::new(Step::ExtractExperiment, e)),
        };
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("experiment") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ExtractError::new(Step::ExtractExperiment, e))?;
                parts.experiment = Some(raw);
            }
            Some("sink") => {
                let key = field
                    .text()
                    .await
                    .map_err(|e| ExtractError::new(Step::InitImport, e))?;
                parts.sink = Some(key);
            }
            Some("samples") => {
                let spooled =
                    spool_field(field, spool.path(), "samples.dat", Step::ExtractSamples).await?;
                parts.samples = Some(spooled);
            }
            Some("alarms") => {
                let spooled =
                    spool_field(field, spool.path(), "alarms.dat", Step::ExtractAlarms).await?;
                parts.alarms = Some(spooled);
            }
            _ => {
                // Drain and ignore unknown fields.
                let _ = field.bytes().await;
            }
        }
    }

    Ok(parts)
}

async fn spool_field(
    mut field: axum::extract::multipart::Field<'_>,
    dir: &Path,
    name: &str,
    step: Step,
) -> Result<SpooledFile, ExtractError> {
    let path = dir.join(name);
    let mut file = File::create(&path)
        .await
        .map_err(|e| ExtractError::new(step, e))?;
    let mut size: u64 = 0;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => return Err(ExtractError::new(step, e)),
        };
        size += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ExtractError::new(step, e))?;
    }
    file.flush()
        .await
        .map_err(|e| ExtractError::new(step, e))?;
    Ok(SpooledFile { path, size })
}
