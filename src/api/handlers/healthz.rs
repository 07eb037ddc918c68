// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};

use crate::api::Routes;
use crate::health::{HealthSnapshot, HealthState};

pub const PATH: &str = "/healthz";

/// Readiness report for both services
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthzResponse {
    pub status: String,
    pub web: String,
    pub metrics: String,
}

fn readiness(ready: bool) -> String {
    let word = if ready { "healthy" } else { "unhealthy" };
    word.to_string()
}

impl From<HealthSnapshot> for HealthzResponse {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            status: snapshot.status().as_str().to_string(),
            web: readiness(snapshot.web),
            metrics: readiness(snapshot.metrics),
        }
    }
}

/// GET /healthz
///
/// 200 when both services are ready, 503 when either is not and 410 once the
/// process is shutting down.
pub async fn healthz(State(health): State<HealthState>) -> impl IntoResponse {
    let snapshot = health.snapshot();
    let status = snapshot.status();
    tracing::debug!(status = status.as_str(), ?snapshot, "/healthz");

    (status.status_code(), Json(HealthzResponse::from(snapshot)))
}

pub fn attach(routes: &mut impl Routes, health: HealthState) {
    routes.route(PATH, get(healthz).with_state(health));
}
