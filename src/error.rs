// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the dashboard application

use thiserror::Error;

use crate::config::ConfigError;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Network or IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event delivery error
    #[error("Send error: {0}")]
    Send(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        Self::Send(error.to_string())
    }
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;
