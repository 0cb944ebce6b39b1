// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The SSE endpoint draining one upload's report channel.

use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use rigstream_model::ReportKind;
use serde::Deserialize;
use std::convert::Infallible;

/// Query parameters of `/events`.
#[derive(Debug, Deserialize)]
pub(crate) struct EventsQuery {
    /// Subscription channel id returned by the upload response.
    channel: String,
}

/// Streams an upload's reports until the terminal client report.
///
/// The channel's receiver is taken out of the registry: one subscriber per
/// upload. Subscribing a second time, or to an unknown channel, is a 404.
pub(crate) async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let mut reports = state
        .channels
        .lock()
        .remove(&query.channel)
        .ok_or(StatusCode::NOT_FOUND)?;

    let stream = async_stream::stream! {
        while let Some(report) = reports.recv().await {
            let terminal = report.is_terminal() && report.kind == ReportKind::Client;
            match Event::default()
                .id(report.seq.to_string())
                .event(report.kind.as_str())
                .json_data(&report)
            {
                Ok(event) => yield Ok(event),
                Err(e) => tracing::warn!("report not serializable: {e}"),
            }
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
