// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prometheus metrics registry for the HTTP listeners
//!
//! Both services record every request here; the metrics service exposes the
//! encoded registry on `/metrics`.

mod labels;

use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::Mutex;

use crate::build_info::BuildInfo;

/// Labels for requests, listeners and build information
pub use labels::{BuildInfoLabels, ComponentLabels, RequestLabels};

type HistogramFamily = Family<RequestLabels, Histogram, fn() -> Histogram>;

fn duration_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.00001, 2.0, 15))
}

fn request_size_histogram() -> Histogram {
    Histogram::new(exponential_buckets(64.0, 2.0, 10))
}

fn response_size_histogram() -> Histogram {
    Histogram::new(exponential_buckets(2.0, 2.0, 16))
}

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    requests: Family<RequestLabels, Counter>,
    response_seconds: HistogramFamily,
    request_size_bytes: HistogramFamily,
    response_size_bytes: HistogramFamily,
    requests_open: Family<ComponentLabels, Gauge>,
    build_info: Family<BuildInfoLabels, Gauge>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests = Family::<RequestLabels, Counter>::default();
        registry.register(
            "dashboard_http_requests",
            "Count of HTTP requests",
            requests.clone(),
        );
        let response_seconds = HistogramFamily::new_with_constructor(duration_histogram);
        registry.register(
            "dashboard_http_response_seconds",
            "Duration of HTTP requests",
            response_seconds.clone(),
        );
        let request_size_bytes = HistogramFamily::new_with_constructor(request_size_histogram);
        registry.register(
            "dashboard_http_request_size_bytes",
            "Size of the HTTP requests",
            request_size_bytes.clone(),
        );
        let response_size_bytes = HistogramFamily::new_with_constructor(response_size_histogram);
        registry.register(
            "dashboard_http_response_size_bytes",
            "Size of the HTTP responses",
            response_size_bytes.clone(),
        );
        let requests_open = Family::<ComponentLabels, Gauge>::default();
        registry.register(
            "dashboard_http_requests_open",
            "Number of requests being actively handled",
            requests_open.clone(),
        );
        let build_info = Family::<BuildInfoLabels, Gauge>::default();
        registry.register(
            "dashboard_build_info",
            "Static build information (value=1)",
            build_info.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            requests,
            response_seconds,
            request_size_bytes,
            response_size_bytes,
            requests_open,
            build_info,
        }
    }

    pub async fn encode_metrics(&self) -> Result<String, std::fmt::Error> {
        let registry = self.registry.lock().await;
        let mut buffer = String::new();
        encode(&mut buffer, &registry)?;
        Ok(buffer)
    }

    pub fn record_build_info(&self, build: &BuildInfo) {
        self.build_info
            .get_or_create(&BuildInfoLabels {
                version: build.version.to_string(),
                commit: build.commit.to_string(),
                branch: build.branch.to_string(),
                arch: build.arch.to_string(),
            })
            .set(1);
    }

    pub fn request_started(&self, labels: &ComponentLabels) {
        self.requests_open.get_or_create(labels).inc();
    }

    pub fn request_finished(&self, labels: &ComponentLabels) {
        self.requests_open.get_or_create(labels).dec();
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_request(
        &self,
        labels: &RequestLabels,
        duration_secs: f64,
        request_bytes: u64,
        response_bytes: u64,
    ) {
        self.requests.get_or_create(labels).inc();
        self.response_seconds
            .get_or_create(labels)
            .observe(duration_secs);
        self.request_size_bytes
            .get_or_create(labels)
            .observe(request_bytes as f64);
        self.response_size_bytes
            .get_or_create(labels)
            .observe(response_bytes as f64);
    }

    /// Completed request count for a label set
    pub fn request_count(&self, labels: &RequestLabels) -> u64 {
        self.requests.get_or_create(labels).get()
    }

    /// Requests currently in flight on a listener
    pub fn open_requests(&self, labels: &ComponentLabels) -> i64 {
        self.requests_open.get_or_create(labels).get()
    }
}
