// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::{
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::api::Routes;
use crate::metrics::MetricsRegistry;

pub const PATH: &str = "/metrics";

pub const CONTENT_TYPE_OPENMETRICS: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

pub async fn metrics_handler(State(metrics): State<MetricsRegistry>) -> Response {
    match metrics.encode_metrics().await {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(CONTENT_TYPE, CONTENT_TYPE_OPENMETRICS)],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

pub fn attach(routes: &mut impl Routes, metrics: MetricsRegistry) {
    routes.route(PATH, get(metrics_handler).with_state(metrics));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::fake::RecordingRoutes;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_metrics_handler_content_type() {
        let response = metrics_handler(State(MetricsRegistry::new())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_OPENMETRICS
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.ends_with("# EOF\n"));
    }

    #[test]
    fn test_attach_registers_metrics() {
        let mut routes = RecordingRoutes::default();
        attach(&mut routes, MetricsRegistry::new());
        assert_eq!(routes.paths, vec!["/metrics"]);
    }
}
