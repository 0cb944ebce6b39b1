// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Liveness probe.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Body of the probe response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProbeResponse {
    probe: &'static str,
    status: &'static str,
    generated_at: String,
}

/// Returns liveness status.
pub(crate) async fn healthz() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        probe: "healthz",
        status: "ok",
        generated_at: Utc::now().to_rfc3339(),
    })
}
