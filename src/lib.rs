// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # Dashboard
//!
//! Backend for a small web dashboard: a web listener and a metrics listener
//! started together, reporting their readiness through shared health state and
//! shut down in order when the process is interrupted.
//!
//! ## Main modules
//! - `api`: routes, handlers and request middleware
//! - `cli`: command-line interface
//! - `config`: configuration loading
//! - `error`: error types
//! - `health`: shared readiness state
//! - `metrics`: Prometheus registry
//! - `orchestrator`: startup and ordered shutdown
//! - `server`: HTTP listeners
//! - `prelude`: commonly used types and traits

pub mod api;
pub mod build_info;
pub mod cli;
pub mod config;
mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod prelude;
pub mod send;
pub mod server;

// Re-export commonly used types
/// Configuration documents
pub use config::{SendConfig, ServeConfig};

/// Application error and result type
pub use error::{AppError, Result};

/// Shared readiness state
pub use health::{HealthState, HealthStatus, ServiceKind};

/// Metrics registry
pub use metrics::MetricsRegistry;

/// Orchestration of both listeners
pub use orchestrator::{Interrupt, Orchestrator, Outcome, Stage, Trigger};

/// HTTP listener service
pub use server::{ListenerService, ServiceError, Timeouts};
