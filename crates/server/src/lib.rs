// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! HTTP boundary of the ingestion server.
//!
//! - POST `/upload` - multipart form with the experiment descriptor, the
//!   samples file, an optional alarms file and the sink key
//! - GET `/events?channel=<id>` - SSE stream of progress reports
//! - GET `/healthz` - liveness probe

pub mod error;
mod events;
mod extract;
mod health;
pub mod settings;
mod upload;

pub use error::Error;
pub use settings::Settings;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use parking_lot::Mutex;
use rigstream_model::Report;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Registry of report channels awaiting their SSE subscriber.
type ChannelRegistry = Arc<Mutex<HashMap<String, mpsc::Receiver<Report>>>>;

/// Shared state for the HTTP server.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Server settings, shared across handlers.
    settings: Arc<Settings>,
    /// Report channels keyed by subscription id, taken by `/events`.
    channels: ChannelRegistry,
}

/// Builds the application router.
#[must_use]
pub fn router(settings: Settings) -> Router {
    let max_upload = settings.http.max_upload_bytes;
    let state = AppState {
        settings: Arc::new(settings),
        channels: Arc::new(Mutex::new(HashMap::new())),
    };
    Router::new()
        .route("/upload", post(upload::upload))
        .route("/events", get(events::events))
        .route("/healthz", get(health::healthz))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the HTTP server until shutdown is requested.
pub async fn run(settings: Settings, cancel: CancellationToken) -> Result<(), Error> {
    let addr = settings
        .http
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|e| Error::InvalidBindAddress {
            bind_address: settings.http.bind_address.clone(),
            details: e.to_string(),
        })?;

    let app = router(settings);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::BindFailed {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;

    tracing::info!(endpoint = %addr, "ingestion server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .map_err(|e| Error::ServerError {
            addr: addr.to_string(),
            details: e.to_string(),
        })
}
