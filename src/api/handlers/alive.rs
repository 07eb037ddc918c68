// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::response::IntoResponse;
use axum::routing::get;

use super::StatusResponse;
use crate::api::Routes;

pub const PATH: &str = "/alive";

/// GET /alive
///
/// Liveness only: answers as long as the metrics listener accepts requests,
/// whatever the readiness of the services.
pub async fn alive() -> impl IntoResponse {
    StatusResponse::new("alive")
}

pub fn attach(routes: &mut impl Routes) {
    routes.route(PATH, get(alive));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_alive() {
        let response = alive().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"alive"}"#);
    }
}
