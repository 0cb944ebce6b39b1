// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! `rigstreamd` - the experiment telemetry ingestion server.

use clap::Parser;
use rigstream_server::Settings;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ingestion server for test-rig experiment telemetry uploads.
#[derive(Debug, Parser)]
#[command(name = "rigstreamd", version, about)]
struct Args {
    /// Path to a YAML settings file.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{e}");
                return std::process::ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };
    if let Some(bind) = args.bind {
        settings.http.bind_address = bind;
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    match rigstream_server::run(settings, cancel).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}
