// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{AppError, Result};

/// Variables that force debug logging when set to `true`, checked in order
const DEBUG_VARS: [&str; 2] = ["DEBUG", "RUNNER_DEBUG"];

/// Map a configured level name onto a filter directive; unknown names log at info
#[must_use]
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warning" | "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Whether debug logging is forced through the environment
///
/// The first of the variables that is set decides.
pub fn debug_forced(lookup: impl Fn(&str) -> Option<String>) -> bool {
    DEBUG_VARS
        .into_iter()
        .find_map(lookup)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn directive(level: &str, lookup: impl Fn(&str) -> Option<String>) -> &'static str {
    if debug_forced(lookup) {
        "debug"
    } else {
        level_directive(level)
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn setup_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(level, |name| std::env::var(name).ok())));

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
