// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Shared readiness state for the web and metrics services
//!
//! All three flags live in a single atomic word, so a snapshot is always taken
//! from one point in time and no update can be torn or lost.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use axum::http::StatusCode;

const WEB_READY: u8 = 0b001;
const METRICS_READY: u8 = 0b010;
const TERMINATING: u8 = 0b100;

/// Which listener a readiness flag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Web,
    Metrics,
}

impl ServiceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Web => "web",
            ServiceKind::Metrics => "metrics",
        }
    }

    fn ready_bit(self) -> u8 {
        match self {
            ServiceKind::Web => WEB_READY,
            ServiceKind::Metrics => METRICS_READY,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness of both services plus the process-wide terminating flag
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    flags: Arc<AtomicU8>,
}

impl HealthState {
    /// Create a new state with nothing ready and not terminating
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_web(&self, ready: bool) {
        self.set_ready(ServiceKind::Web, ready);
    }

    pub fn set_metrics(&self, ready: bool) {
        self.set_ready(ServiceKind::Metrics, ready);
    }

    /// Set the readiness flag owned by `kind`
    pub fn set_ready(&self, kind: ServiceKind, ready: bool) {
        let bit = kind.ready_bit();
        if ready {
            self.flags.fetch_or(bit, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!bit, Ordering::SeqCst);
        }
    }

    /// Mark the whole system as shutting down. Never reset.
    pub fn set_terminating(&self) {
        self.flags.fetch_or(TERMINATING, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        let flags = self.flags.load(Ordering::SeqCst);
        HealthSnapshot {
            web: flags & WEB_READY != 0,
            metrics: flags & METRICS_READY != 0,
            terminating: flags & TERMINATING != 0,
        }
    }
}

/// Point-in-time copy of [`HealthState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub web: bool,
    pub metrics: bool,
    pub terminating: bool,
}

impl HealthSnapshot {
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        if self.terminating {
            HealthStatus::Terminating
        } else if self.web && self.metrics {
            HealthStatus::Ok
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Overall classification reported by `/healthz`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
    Unhealthy,
    Terminating,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Terminating => "terminating",
        }
    }

    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Ok => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Terminating => StatusCode::GONE,
        }
    }
}
