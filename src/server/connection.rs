// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Serving a single accepted TCP connection
//!
//! Applies the header, read, write and idle timeouts and reacts to the
//! listener phase so in-flight requests can finish during a drain.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::BoxError;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use hyper::body::{Body as HttpBody, Frame, Incoming, SizeHint};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{Instant, Sleep};
use tower::ServiceExt;

use super::{Phase, Timeouts, reached};

/// HTTP/1 and HTTP/2 connection builder shared by every connection of a listener
pub(super) fn builder(timeouts: &Timeouts) -> Builder<TokioExecutor> {
    let mut builder = Builder::new(TokioExecutor::new());
    builder.http1().timer(TokioTimer::new());
    if !timeouts.headers.is_zero() {
        builder.http1().header_read_timeout(timeouts.headers);
    }
    builder.http2().timer(TokioTimer::new());
    builder
}

/// Request activity on one connection, used to detect idle keep-alive
pub(super) struct Activity {
    in_flight: AtomicUsize,
    last: Mutex<Instant>,
}

pub(super) struct ActivityGuard(Arc<Activity>);

impl Activity {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicUsize::new(0),
            last: Mutex::new(Instant::now()),
        })
    }

    pub(super) fn begin(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ActivityGuard(Arc::clone(self))
    }

    fn last(&self) -> Instant {
        match self.last.lock() {
            Ok(last) => *last,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn touch(&self) {
        match self.last.lock() {
            Ok(mut last) => *last = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
    }

    /// When the connection could next become idle
    pub(super) fn next_check(&self, idle: Duration) -> Instant {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            Instant::now() + idle
        } else {
            self.last() + idle
        }
    }

    pub(super) fn is_idle(&self, idle: Duration) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0 && self.last().elapsed() >= idle
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn idle_elapsed(activity: &Activity, idle: Duration) {
    loop {
        tokio::time::sleep_until(activity.next_check(idle)).await;
        if activity.is_idle(idle) {
            return;
        }
    }
}

#[derive(Debug, Error)]
#[error("request body not received within {0:?}")]
pub(super) struct BodyTimeout(Duration);

/// Request body that has to arrive in full before one fixed deadline
pub(super) struct DeadlineBody<B> {
    inner: Pin<Box<B>>,
    deadline: Pin<Box<Sleep>>,
    timeout: Duration,
}

impl<B> DeadlineBody<B> {
    /// The deadline starts now, not at the first frame
    pub(super) fn new(inner: B, timeout: Duration) -> Self {
        Self {
            inner: Box::pin(inner),
            deadline: Box::pin(tokio::time::sleep(timeout)),
            timeout,
        }
    }
}

impl<B> HttpBody for DeadlineBody<B>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    type Data = B::Data;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Poll::Ready(frame) = this.inner.as_mut().poll_frame(cx) {
            return Poll::Ready(frame).map_err(Into::into);
        }
        match this.deadline.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Some(Err(BodyTimeout(this.timeout).into()))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn request_body(body: Incoming, read: Duration) -> Body {
    if read.is_zero() {
        Body::new(body)
    } else {
        Body::new(DeadlineBody::new(body, read))
    }
}

pub(super) async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    builder: Arc<Builder<TokioExecutor>>,
    router: Router,
    timeouts: Timeouts,
    mut phase: watch::Receiver<Phase>,
) {
    let activity = Activity::new();

    let service = {
        let activity = Arc::clone(&activity);
        service_fn(move |request: hyper::Request<Incoming>| {
            let guard = activity.begin();
            let router = router.clone();
            async move {
                let _guard = guard;
                let mut request = request.map(|body| request_body(body, timeouts.read));
                request.extensions_mut().insert(ConnectInfo(peer));

                if timeouts.write.is_zero() {
                    return router.oneshot(request).await;
                }
                match tokio::time::timeout(timeouts.write, router.oneshot(request)).await {
                    Ok(response) => response,
                    Err(_) => {
                        tracing::warn!(%peer, timeout = ?timeouts.write, "Response not produced in time");
                        Ok(StatusCode::SERVICE_UNAVAILABLE.into_response())
                    }
                }
            }
        })
    };

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(%peer, "Connection closed with error: {}", e);
                }
                return;
            }
            () = reached(&mut phase, |p| *p != Phase::Running), if !closing => {
                conn.as_mut().graceful_shutdown();
                closing = true;
            }
            () = idle_elapsed(&activity, timeouts.idle), if !closing && !timeouts.idle.is_zero() => {
                tracing::debug!(%peer, "Closing idle connection");
                conn.as_mut().graceful_shutdown();
                closing = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use http_body_util::BodyExt;
    use std::convert::Infallible;

    const IDLE: Duration = Duration::from_secs(30);

    /// One byte every `gap`
    struct Trickle {
        left: usize,
        gap: Duration,
        next: Pin<Box<Sleep>>,
    }

    impl Trickle {
        fn new(len: usize, gap: Duration) -> Self {
            Self {
                left: len,
                gap,
                next: Box::pin(tokio::time::sleep(gap)),
            }
        }
    }

    impl HttpBody for Trickle {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            let this = self.get_mut();
            if this.left == 0 {
                return Poll::Ready(None);
            }
            std::task::ready!(this.next.as_mut().poll(cx));
            this.left -= 1;
            let next = Instant::now() + this.gap;
            this.next.as_mut().reset(next);
            Poll::Ready(Some(Ok(Frame::data(Bytes::from_static(b"x")))))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trickled_body_past_deadline_fails() {
        // Every gap is shorter than the deadline, the whole body is not
        let body = DeadlineBody::new(
            Trickle::new(6, Duration::from_millis(100)),
            Duration::from_millis(300),
        );
        let err = body.collect().await.unwrap_err();
        assert!(err.is::<BodyTimeout>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_within_deadline_is_complete() {
        let body = DeadlineBody::new(
            Trickle::new(6, Duration::from_millis(100)),
            Duration::from_secs(1),
        );
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"xxxxxx");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_connection_is_idle_after_timeout() {
        let activity = Activity::new();
        assert!(!activity.is_idle(IDLE));

        tokio::time::advance(IDLE).await;
        assert!(activity.is_idle(IDLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_request_is_never_idle() {
        let activity = Activity::new();
        let guard = activity.begin();

        tokio::time::advance(IDLE * 2).await;
        assert!(!activity.is_idle(IDLE));
        assert!(activity.next_check(IDLE) > Instant::now());

        drop(guard);
        assert!(!activity.is_idle(IDLE));
        tokio::time::advance(IDLE).await;
        assert!(activity.is_idle(IDLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_elapsed_waits_for_quiet_period() {
        let activity = Activity::new();
        let start = Instant::now();

        tokio::time::advance(Duration::from_secs(10)).await;
        drop(activity.begin());

        idle_elapsed(&activity, IDLE).await;
        assert!(start.elapsed() >= Duration::from_secs(40));
    }
}
