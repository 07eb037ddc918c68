// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP listeners and their lifecycle
//!
//! A [`ListenerService`] owns one TCP listener. `start` binds and serves until
//! `shutdown` asks it to drain; readiness is mirrored into the shared
//! [`HealthState`] and bind failures are reported on the orchestrator's error
//! channel.

mod connection;
mod services;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::TimeoutsConfig;
use crate::health::{HealthState, ServiceKind};

pub use services::{metrics_service, trust_proxies, web_service};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} service failed to listen on {address}: {source}")]
    Bind {
        service: ServiceKind,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{service} service did not finish draining within {timeout:?}")]
    DrainTimeout {
        service: ServiceKind,
        timeout: Duration,
    },
}

/// Per-connection timeouts; a zero duration disables the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub headers: Duration,
    pub read: Duration,
    pub write: Duration,
    pub idle: Duration,
}

impl From<&TimeoutsConfig> for Timeouts {
    fn from(config: &TimeoutsConfig) -> Self {
        Self {
            headers: Duration::from_secs(config.headers),
            read: Duration::from_secs(config.read),
            write: Duration::from_secs(config.write),
            idle: Duration::from_secs(config.idle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Running,
    /// Stop accepting and let open connections finish
    Draining,
    /// Drop whatever is still open
    Aborted,
}

/// Resolve once `pred` holds for the watched value
///
/// The borrowed value is released before returning so callers can hold the
/// future across other awaits.
pub(crate) async fn reached<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    let _ = rx.wait_for(pred).await;
}

pub struct ListenerService {
    kind: ServiceKind,
    address: String,
    port: u16,
    timeouts: Timeouts,
    router: Router,
    health: HealthState,
    phase: watch::Sender<Phase>,
    stopped: watch::Sender<bool>,
    started: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
}

impl ListenerService {
    pub fn new(
        kind: ServiceKind,
        address: impl Into<String>,
        port: u16,
        timeouts: Timeouts,
        router: Router,
        health: HealthState,
    ) -> Self {
        Self {
            kind,
            address: address.into(),
            port,
            timeouts,
            router,
            health,
            phase: watch::Sender::new(Phase::Running),
            stopped: watch::Sender::new(false),
            started: AtomicBool::new(false),
            local_addr: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Address actually bound, once `start` got that far
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Router with the full middleware stack, as served on each connection
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Bind and serve until the listener is shut down
    ///
    /// A bind failure clears readiness and is reported once on `errors`
    /// without waiting for channel capacity.
    pub async fn start(&self, errors: mpsc::Sender<ServiceError>) {
        self.started.store(true, Ordering::SeqCst);
        if *self.phase.borrow() != Phase::Running {
            tracing::debug!(service = %self.kind, "Shut down before start, not binding");
            self.stopped.send_replace(true);
            return;
        }

        tracing::info!(service = %self.kind, address = %self.endpoint(), "Starting {} service", self.kind);

        let listener = match TcpListener::bind((self.address.as_str(), self.port)).await {
            Ok(listener) => listener,
            Err(source) => {
                self.health.set_ready(self.kind, false);
                let err = ServiceError::Bind {
                    service: self.kind,
                    address: self.endpoint(),
                    source,
                };
                tracing::error!(service = %self.kind, "Failed to start {} service: {}", self.kind, err);
                if let Err(e) = errors.try_send(err) {
                    tracing::warn!(service = %self.kind, "Dropped startup error: {}", e);
                }
                self.stopped.send_replace(true);
                return;
            }
        };

        // Holding the phase lock keeps a concurrent shutdown from being undone
        self.phase.send_if_modified(|phase| {
            if *phase == Phase::Running {
                self.health.set_ready(self.kind, true);
            }
            false
        });

        if let Ok(addr) = listener.local_addr() {
            let _ = self.local_addr.set(addr);
            tracing::info!(service = %self.kind, %addr, "{} service listening", self.kind);
        }

        self.serve(listener).await;
        self.stopped.send_replace(true);
        tracing::info!(service = %self.kind, "{} service stopped", self.kind);
    }

    async fn serve(&self, listener: TcpListener) {
        let builder = Arc::new(connection::builder(&self.timeouts));
        let mut phase = self.phase.subscribe();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = reached(&mut phase, |p| *p != Phase::Running) => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(connection::serve(
                            stream,
                            peer,
                            Arc::clone(&builder),
                            self.router.clone(),
                            self.timeouts,
                            self.phase.subscribe(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(service = %self.kind, "Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        tracing::debug!(
            service = %self.kind,
            open = connections.len(),
            "Stopped accepting, draining connections"
        );

        loop {
            tokio::select! {
                joined = connections.join_next() => {
                    if joined.is_none() {
                        break;
                    }
                }
                () = reached(&mut phase, |p| *p == Phase::Aborted) => {
                    tracing::warn!(
                        service = %self.kind,
                        open = connections.len(),
                        "Closing connections that did not drain"
                    );
                    connections.shutdown().await;
                    break;
                }
            }
        }
    }

    /// Mark the whole process as terminating ahead of the drain
    pub fn prepare_shutdown(&self) {
        self.health.set_terminating();
    }

    /// Stop accepting and drain open connections within `timeout`
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ServiceError> {
        tracing::info!(service = %self.kind, "Shutting down {} service", self.kind);

        self.phase.send_modify(|phase| {
            self.health.set_ready(self.kind, false);
            if *phase == Phase::Running {
                *phase = Phase::Draining;
            }
        });

        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut stopped = self.stopped.subscribe();
        if tokio::time::timeout(timeout, reached(&mut stopped, |s| *s))
            .await
            .is_ok()
        {
            return Ok(());
        }

        self.phase.send_replace(Phase::Aborted);
        Err(ServiceError::DrainTimeout {
            service: self.kind,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    fn timeouts() -> Timeouts {
        Timeouts::from(&TimeoutsConfig::default())
    }

    fn service(health: HealthState) -> Arc<ListenerService> {
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        Arc::new(ListenerService::new(
            ServiceKind::Web,
            "127.0.0.1",
            0,
            timeouts(),
            router,
            health,
        ))
    }

    #[test]
    fn test_timeouts_from_config() {
        let timeouts = timeouts();
        assert_eq!(timeouts.headers, Duration::from_secs(2));
        assert_eq!(timeouts.read, Duration::from_secs(5));
        assert_eq!(timeouts.write, Duration::from_secs(10));
        assert_eq!(timeouts.idle, Duration::from_secs(30));
    }

    #[test]
    fn test_bind_error_display() {
        let err = ServiceError::Bind {
            service: ServiceKind::Metrics,
            address: "localhost:8888".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "metrics service failed to listen on localhost:8888: address in use"
        );
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_ok() {
        let health = HealthState::new();
        let service = service(health.clone());

        service.shutdown(Duration::from_secs(1)).await.unwrap();

        // A start racing in afterwards must not bind or mark ready
        let (tx, _rx) = mpsc::channel(1);
        service.start(tx).await;
        assert!(service.local_addr().is_none());
        assert!(!health.snapshot().web);
    }

    #[tokio::test]
    async fn test_start_marks_ready_and_shutdown_clears() {
        let health = HealthState::new();
        let service = service(health.clone());
        let (tx, _rx) = mpsc::channel(1);

        let task = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.start(tx).await }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while !health.snapshot().web {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("service never became ready");
        assert!(service.local_addr().is_some());

        service.shutdown(Duration::from_secs(5)).await.unwrap();
        assert!(!health.snapshot().web);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_prepare_shutdown_sets_terminating() {
        let health = HealthState::new();
        service(health.clone()).prepare_shutdown();
        assert!(health.snapshot().terminating);
    }
}
