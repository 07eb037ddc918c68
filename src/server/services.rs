// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Construction of the web and metrics listeners from configuration

use crate::api::handlers::{alive, healthz, metrics, ping};
use crate::api::{Routes, ServiceRouter};
use crate::config::ServeConfig;
use crate::health::{HealthState, ServiceKind};
use crate::metrics::MetricsRegistry;

use super::{ListenerService, Timeouts};

/// Apply the trusted proxy list, falling back to trusting every peer when an
/// entry is invalid
pub fn trust_proxies(routes: &mut impl Routes, entries: &[String]) {
    if let Err(e) = routes.set_trusted_proxies(entries) {
        tracing::warn!("Ignoring trusted proxies configuration: {}", e);
    }
}

fn listener(
    kind: ServiceKind,
    config: &ServeConfig,
    routes: ServiceRouter,
    health: HealthState,
) -> ListenerService {
    let port = match kind {
        ServiceKind::Web => config.endpoints.bind.port.web,
        ServiceKind::Metrics => config.endpoints.bind.port.metrics,
    };

    ListenerService::new(
        kind,
        config.endpoints.bind.address.clone(),
        port,
        Timeouts::from(&config.endpoints.timeouts),
        routes.finish(),
        health,
    )
}

/// Web listener serving `/ping`
pub fn web_service(
    config: &ServeConfig,
    health: HealthState,
    registry: MetricsRegistry,
) -> ListenerService {
    let mut routes = ServiceRouter::new(ServiceKind::Web, config.cluster.name.clone(), registry);
    trust_proxies(&mut routes, &config.endpoints.proxies);
    ping::attach(&mut routes);

    listener(ServiceKind::Web, config, routes, health)
}

/// Metrics listener serving `/metrics`, `/alive` and `/healthz`
pub fn metrics_service(
    config: &ServeConfig,
    health: HealthState,
    registry: MetricsRegistry,
) -> ListenerService {
    let mut routes = ServiceRouter::new(
        ServiceKind::Metrics,
        config.cluster.name.clone(),
        registry.clone(),
    );
    trust_proxies(&mut routes, &config.endpoints.proxies);
    metrics::attach(&mut routes, registry);
    alive::attach(&mut routes);
    healthz::attach(&mut routes, health.clone());

    listener(ServiceKind::Metrics, config, routes, health)
}
