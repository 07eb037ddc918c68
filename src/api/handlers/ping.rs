// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use axum::response::IntoResponse;
use axum::routing::get;

use super::StatusResponse;
use crate::api::Routes;

pub const PATH: &str = "/ping";

/// GET /ping
pub async fn ping() -> impl IntoResponse {
    StatusResponse::new("pong")
}

pub fn attach(routes: &mut impl Routes) {
    routes.route(PATH, get(ping));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::fake::RecordingRoutes;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_ping() {
        let response = ping().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"pong"}"#);
    }

    #[test]
    fn test_attach_registers_ping() {
        let mut routes = RecordingRoutes::default();
        attach(&mut routes);
        assert_eq!(routes.paths, vec!["/ping"]);
    }
}
