// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! ```rust
//! use dashboard::prelude::*;
//! ```

// Core types
pub use crate::config::{SendConfig, ServeConfig};
pub use crate::error::{AppError, Result};
pub use crate::health::{HealthSnapshot, HealthState, HealthStatus, ServiceKind};

// HTTP
pub use crate::api::{Routes, ServiceRouter, TrustedProxies};
pub use crate::metrics::MetricsRegistry;
pub use crate::server::{ListenerService, ServiceError, Timeouts};

// Lifecycle
pub use crate::orchestrator::{Interrupt, Orchestrator, OsSignals, Outcome, Stage, Trigger};
