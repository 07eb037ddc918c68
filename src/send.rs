// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Delivery of events to a running dashboard

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub status: String,
    pub message: String,
}

impl Event {
    /// Build an event, generating an id when none is given
    pub fn new(id: Option<String>, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            status: status.into(),
            message: message.into(),
        }
    }
}

pub struct EventSender {
    client: reqwest::Client,
    endpoint: String,
}

impl EventSender {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn events_url(&self) -> String {
        format!("{}/events", self.endpoint.trim_end_matches('/'))
    }

    pub async fn send(&self, event: &Event) -> Result<()> {
        let url = self.events_url();
        tracing::debug!(%url, id = %event.id, "Sending event");

        let response = self.client.post(&url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Send(format!("{url} responded with {status}")));
        }

        tracing::info!(id = %event.id, status = %event.status, "Event sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{Json, Router, extract::State, routing::post};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<Event>>>;

    async fn spawn_endpoint(status: StatusCode) -> (String, Received) {
        let received = Received::default();
        let app = Router::new()
            .route(
                "/events",
                post(
                    move |State(received): State<Received>, Json(event): Json<Event>| async move {
                        received.lock().unwrap().push(event);
                        status
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}"), received)
    }

    fn sender(endpoint: &str) -> EventSender {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        EventSender::with_client(client, endpoint)
    }

    #[test]
    fn test_event_generates_id() {
        let event = Event::new(None, "ok", "deployed");
        assert_eq!(event.id.len(), 36);

        let event = Event::new(Some("evt-1".to_string()), "ok", "deployed");
        assert_eq!(event.id, "evt-1");
    }

    #[test]
    fn test_events_url_trims_slash() {
        let sender = sender("http://localhost:8080/");
        assert_eq!(sender.events_url(), "http://localhost:8080/events");
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let (endpoint, received) = spawn_endpoint(StatusCode::ACCEPTED).await;
        let event = Event::new(Some("evt-1".to_string()), "failed", "build broke");

        sender(&endpoint).send(&event).await.unwrap();

        assert_eq!(received.lock().unwrap().as_slice(), &[event]);
    }

    #[tokio::test]
    async fn test_send_rejects_error_status() {
        let (endpoint, _received) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
        let event = Event::new(None, "ok", "hello");

        let err = sender(&endpoint).send(&event).await.unwrap_err();
        assert!(matches!(err, AppError::Send(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_send_unreachable_endpoint() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = sender(&format!("http://{addr}"))
            .send(&Event::new(None, "ok", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Send(_)));
    }
}
