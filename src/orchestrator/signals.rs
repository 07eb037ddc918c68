// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Operating system termination signals

use std::future::Future;

/// Source of the interrupt that starts a graceful shutdown
pub trait Interrupt {
    /// Resolve on the next interrupt
    fn wait(&mut self) -> impl Future<Output = ()> + Send;

    /// Hand the interrupt back once the web service has drained, so that a
    /// further interrupt ends the process immediately
    fn release(self);
}

/// SIGINT and SIGTERM on unix, Ctrl+C elsewhere
pub struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignals {
    /// Install the handlers up front so no signal is missed during startup
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Drop the current handles and listen afresh
    ///
    /// Signals that arrived while nobody was waiting are forgotten.
    pub fn rearm(self) -> std::io::Result<Self> {
        drop(self);
        Self::install()
    }
}

impl Interrupt for OsSignals {
    #[cfg(unix)]
    async fn wait(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => tracing::debug!("Received SIGINT"),
            _ = self.terminate.recv() => tracing::debug!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn wait(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }

    fn release(self) {
        let mut signals = match self.rearm() {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!("Unable to listen for a second interrupt: {}", e);
                return;
            }
        };
        tokio::spawn(async move {
            signals.wait().await;
            tracing::warn!("Received second interrupt, exiting immediately");
            std::process::exit(1);
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn send_sigterm() {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_rearm_forgets_signals_received_while_not_waiting() {
        let mut signals = OsSignals::install().unwrap();

        send_sigterm();
        tokio::time::timeout(Duration::from_secs(5), signals.wait())
            .await
            .expect("first SIGTERM not seen");

        // Arrives while nothing waits, as during the web drain
        send_sigterm();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut signals = signals.rearm().unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(300), signals.wait())
                .await
                .is_err(),
            "signal from before rearm was replayed"
        );
    }
}
