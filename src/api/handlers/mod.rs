// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Endpoint handlers and their route registration

pub mod alive;
pub mod healthz;
pub mod metrics;
pub mod ping;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

/// Body of the simple probe endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub(crate) fn new(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub status: String,
    pub code: u16,
    pub message: String,
}

/// Fallback for every unmatched request on both services
pub async fn not_found() -> impl IntoResponse {
    let response = NotFoundResponse {
        status: "page-not-found".to_string(),
        code: StatusCode::NOT_FOUND.as_u16(),
        message: "The path requested could not be found".to_string(),
    };

    (StatusCode::NOT_FOUND, Json(response))
}

#[cfg(test)]
pub(crate) mod fake {
    use axum::routing::MethodRouter;

    use crate::api::{ProxyError, Routes, TrustedProxies};

    /// Records registrations without building a router
    #[derive(Default)]
    pub struct RecordingRoutes {
        pub paths: Vec<&'static str>,
        pub proxies: Option<TrustedProxies>,
    }

    impl Routes for RecordingRoutes {
        fn route(&mut self, path: &'static str, _handler: MethodRouter) {
            self.paths.push(path);
        }

        fn set_trusted_proxies(&mut self, entries: &[String]) -> Result<(), ProxyError> {
            let proxies = TrustedProxies::parse(entries)?;
            self.proxies = Some(proxies);
            Ok(())
        }
    }
}
