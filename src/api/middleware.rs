// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Request middleware shared by both services

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::proxies::ClientIp;
use crate::health::ServiceKind;
use crate::metrics::{ComponentLabels, MetricsRegistry, RequestLabels};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Path label for requests that matched no registered route
const UNMATCHED_PATH: &str = "404";

/// Probe and scrape paths, too frequent to log at info
const QUIET_PATHS: [&str; 3] = ["/alive", "/healthz", "/metrics"];

pub(crate) struct RequestContext {
    pub kind: ServiceKind,
    pub cluster: String,
    pub metrics: MetricsRegistry,
    pub paths: HashSet<&'static str>,
}

impl RequestContext {
    fn path_label(&self, path: &str) -> String {
        if self.paths.contains(path) {
            path.to_string()
        } else {
            UNMATCHED_PATH.to_string()
        }
    }

    fn component(&self) -> ComponentLabels {
        ComponentLabels {
            cluster: self.cluster.clone(),
            component: self.kind.to_string(),
        }
    }
}

/// Keeps the open-requests gauge balanced even when a request is cancelled
struct OpenRequest<'a> {
    metrics: &'a MetricsRegistry,
    labels: ComponentLabels,
}

impl<'a> OpenRequest<'a> {
    fn start(metrics: &'a MetricsRegistry, labels: ComponentLabels) -> Self {
        metrics.request_started(&labels);
        Self { metrics, labels }
    }
}

impl Drop for OpenRequest<'_> {
    fn drop(&mut self) {
        self.metrics.request_finished(&self.labels);
    }
}

pub(crate) async fn record_metrics(
    State(context): State<Arc<RequestContext>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = context.path_label(request.uri().path());
    let request_bytes = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let open = OpenRequest::start(&context.metrics, context.component());
    let response = next.run(request).await;
    drop(open);

    let labels = RequestLabels {
        cluster: context.cluster.clone(),
        component: context.kind.to_string(),
        method,
        path,
        status: response.status().as_u16().to_string(),
    };
    let response_bytes = response.body().size_hint().exact().unwrap_or(0);
    context.metrics.record_request(
        &labels,
        start.elapsed().as_secs_f64(),
        request_bytes,
        response_bytes,
    );

    response
}

/// Tag the request and response with an id, keeping one supplied by the client
pub(crate) async fn request_id(mut request: Request, next: Next) -> Response {
    let id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(id) => id.clone(),
        None => {
            let id = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
            request.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
            id
        }
    };

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, id);
    response
}

fn is_quiet(path: &str, status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND)
        || QUIET_PATHS.contains(&path)
}

pub(crate) async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ClientIp>()
        .map_or_else(|| "-".to_string(), |ClientIp(ip)| ip.to_string());
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;
    let status = response.status();
    let latency = start.elapsed();

    macro_rules! access {
        ($level:ident) => {
            tracing::$level!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                latency = ?latency,
                client_ip = %client_ip,
                request_id = %request_id,
                "HTTP request"
            )
        };
    }

    if status.is_server_error() {
        access!(error);
    } else if is_quiet(&path, status) {
        access!(debug);
    } else if status.is_client_error() {
        access!(warn);
    } else {
        access!(info);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            kind: ServiceKind::Metrics,
            cluster: "default".to_string(),
            metrics: MetricsRegistry::new(),
            paths: HashSet::from(["/metrics", "/healthz"]),
        }
    }

    #[test]
    fn test_path_label_uses_registered_route() {
        let context = context();
        assert_eq!(context.path_label("/metrics"), "/metrics");
        assert_eq!(context.path_label("/nope"), "404");
        assert_eq!(context.path_label("/metrics/extra"), "404");
    }

    #[test]
    fn test_open_request_guard_balances_gauge() {
        let context = context();
        let labels = context.component();
        {
            let _open = OpenRequest::start(&context.metrics, labels.clone());
            assert_eq!(context.metrics.open_requests(&labels), 1);
        }
        assert_eq!(context.metrics.open_requests(&labels), 0);
    }

    #[test]
    fn test_quiet_requests() {
        assert!(is_quiet("/healthz", StatusCode::OK));
        assert!(is_quiet("/alive", StatusCode::OK));
        assert!(is_quiet("/anything", StatusCode::NOT_FOUND));
        assert!(is_quiet("/ping", StatusCode::UNAUTHORIZED));
        assert!(!is_quiet("/ping", StatusCode::OK));
        assert!(!is_quiet("/ping", StatusCode::BAD_REQUEST));
    }
}
