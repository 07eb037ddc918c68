// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Startup and ordered shutdown of the web and metrics services
//!
//! Both services start in their own task and report bind failures on a shared
//! channel. The first interrupt or failure triggers the shutdown: the process
//! is marked terminating, web drains within the configured timeout, then
//! metrics drains within a short fixed one.

mod signals;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::{ServeConfig, defaults};
use crate::health::HealthState;
use crate::metrics::MetricsRegistry;
use crate::server::{ListenerService, ServiceError, metrics_service, web_service};

pub use signals::{Interrupt, OsSignals};

/// One slot per service, so neither start ever waits to report
const ERROR_CHANNEL_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Starting,
    Running,
    DrainingWeb,
    DrainingMetrics,
    Stopped,
}

/// What ended the run
#[derive(Debug)]
pub enum Trigger {
    Interrupt,
    Failure(ServiceError),
}

#[derive(Debug)]
pub struct Outcome {
    pub trigger: Trigger,
    pub web: Result<(), ServiceError>,
    pub metrics: Result<(), ServiceError>,
}

impl Outcome {
    /// A startup failure ended the run; drain errors do not count
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.trigger, Trigger::Failure(_))
    }
}

/// Metrics drains after web with strictly less time, at most half of web's
fn metrics_deadline(requested: Duration, web_timeout: Duration) -> Duration {
    requested.min(web_timeout / 2)
}

pub struct Orchestrator {
    web: Arc<ListenerService>,
    metrics: Arc<ListenerService>,
    web_timeout: Duration,
    metrics_timeout: Duration,
    stage: watch::Sender<Stage>,
}

impl Orchestrator {
    pub fn new(config: &ServeConfig, health: HealthState, registry: MetricsRegistry) -> Self {
        Self::from_services(
            web_service(config, health.clone(), registry.clone()),
            metrics_service(config, health, registry),
            config.endpoints.timeouts.shutdown(),
        )
    }

    pub fn from_services(
        web: ListenerService,
        metrics: ListenerService,
        web_timeout: Duration,
    ) -> Self {
        Self {
            web: Arc::new(web),
            metrics: Arc::new(metrics),
            web_timeout,
            metrics_timeout: metrics_deadline(
                Duration::from_secs(defaults::METRICS_SHUTDOWN_TIMEOUT_SECS),
                web_timeout,
            ),
            stage: watch::Sender::new(Stage::Starting),
        }
    }

    /// Override the metrics drain timeout; it is still kept below web's
    #[must_use]
    pub fn with_metrics_timeout(mut self, timeout: Duration) -> Self {
        self.metrics_timeout = metrics_deadline(timeout, self.web_timeout);
        self
    }

    #[must_use]
    pub fn web_service(&self) -> Arc<ListenerService> {
        Arc::clone(&self.web)
    }

    #[must_use]
    pub fn metrics_service(&self) -> Arc<ListenerService> {
        Arc::clone(&self.metrics)
    }

    /// Follow the orchestrator through its stages
    #[must_use]
    pub fn stages(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    pub async fn run<I>(self, mut interrupt: I) -> Outcome
    where
        I: Interrupt + Send,
    {
        let (errors_tx, mut errors) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        // Web first, so it is ahead of metrics on the way up as on the way down
        for service in [&self.web, &self.metrics] {
            let service = Arc::clone(service);
            let errors_tx = errors_tx.clone();
            tokio::spawn(async move { service.start(errors_tx).await });
        }
        drop(errors_tx);
        self.stage.send_replace(Stage::Running);

        let trigger = tokio::select! {
            () = interrupt.wait() => {
                tracing::info!("Shutting down dashboard gracefully");
                Trigger::Interrupt
            }
            Some(err) = errors.recv() => {
                tracing::error!(error = %err, "Shutting down dashboard due to startup failure");
                Trigger::Failure(err)
            }
        };

        self.stage.send_replace(Stage::DrainingWeb);
        self.metrics.prepare_shutdown();
        let web = self.web.shutdown(self.web_timeout).await;
        if let Err(e) = &web {
            tracing::error!(error = %e, "Forced to shut down web service ungracefully");
        }
        interrupt.release();

        self.stage.send_replace(Stage::DrainingMetrics);
        let metrics = self.metrics.shutdown(self.metrics_timeout).await;
        if let Err(e) = &metrics {
            tracing::error!(error = %e, "Forced to shut down metrics service ungracefully");
        }

        self.stage.send_replace(Stage::Stopped);
        tracing::info!("Dashboard stopped");

        Outcome {
            trigger,
            web,
            metrics,
        }
    }
}
