// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP routing for the web and metrics services
//!
//! Handlers register themselves through the [`Routes`] trait; the concrete
//! [`ServiceRouter`] turns the registrations into an axum [`Router`] wrapped in
//! the shared middleware stack.
//!
//! # Endpoints
//! - `GET /ping` — web liveness probe
//! - `GET /alive` — metrics liveness probe
//! - `GET /healthz` — readiness of both services
//! - `GET /metrics` — Prometheus metrics

pub mod handlers;
mod middleware;
pub mod proxies;

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use tower_http::catch_panic::CatchPanicLayer;

use crate::health::ServiceKind;
use crate::metrics::MetricsRegistry;

pub use middleware::REQUEST_ID_HEADER;
pub use proxies::{ClientIp, ProxyError, TrustedProxies};

/// Route registration surface used by the endpoint handlers
pub trait Routes {
    /// Register `handler` under a fixed `path`
    fn route(&mut self, path: &'static str, handler: MethodRouter);

    /// Replace the trusted proxy list
    ///
    /// On error the router keeps trusting every peer and the error is returned
    /// for the caller to report.
    fn set_trusted_proxies(&mut self, entries: &[String]) -> Result<(), ProxyError>;
}

/// Router for one listener, collecting routes before the middleware is applied
pub struct ServiceRouter {
    kind: ServiceKind,
    cluster: String,
    metrics: MetricsRegistry,
    router: Router,
    paths: HashSet<&'static str>,
    proxies: TrustedProxies,
}

impl ServiceRouter {
    pub fn new(kind: ServiceKind, cluster: impl Into<String>, metrics: MetricsRegistry) -> Self {
        Self {
            kind,
            cluster: cluster.into(),
            metrics,
            router: Router::new(),
            paths: HashSet::new(),
            proxies: TrustedProxies::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn proxies(&self) -> &TrustedProxies {
        &self.proxies
    }

    /// Registered paths, in no particular order
    #[cfg(test)]
    pub(crate) fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.paths.iter().copied()
    }

    /// Build the final router with the not-found fallback and middleware stack
    pub fn finish(self) -> Router {
        let context = Arc::new(middleware::RequestContext {
            kind: self.kind,
            cluster: self.cluster,
            metrics: self.metrics,
            paths: self.paths,
        });

        // Last layer added runs first
        self.router
            .fallback(handlers::not_found)
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(from_fn_with_state(context, middleware::record_metrics))
            .layer(from_fn(middleware::access_log))
            .layer(from_fn(middleware::request_id))
            .layer(from_fn_with_state(
                Arc::new(self.proxies),
                proxies::resolve_client_ip,
            ))
    }
}

impl Routes for ServiceRouter {
    fn route(&mut self, path: &'static str, handler: MethodRouter) {
        self.router = std::mem::take(&mut self.router).route(path, handler);
        self.paths.insert(path);
    }

    fn set_trusted_proxies(&mut self, entries: &[String]) -> Result<(), ProxyError> {
        match TrustedProxies::parse(entries) {
            Ok(proxies) => {
                self.proxies = proxies;
                Ok(())
            }
            Err(e) => {
                self.proxies = TrustedProxies::All;
                Err(e)
            }
        }
    }
}

fn handle_panic(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
