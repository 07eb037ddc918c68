// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use clap::Args;

use super::GlobalArgs;
use crate::config::{self, SendConfig, env_vars, files};
use crate::error::Result;
use crate::logging::setup_tracing;
use crate::send::{Event, EventSender};

#[derive(Debug, Default, Args)]
pub struct SendArgs {
    /// Base URI of the dashboard receiving the event
    #[arg(long, env = env_vars::ENDPOINT_URI)]
    pub endpoint_uri: Option<String>,

    /// Event id, generated when omitted
    #[arg(long)]
    pub event_id: Option<String>,

    #[arg(long, default_value = "info")]
    pub status: String,

    #[arg(long, default_value = "")]
    pub message: String,
}

impl SendArgs {
    pub fn apply(&self, config: &mut SendConfig) {
        if let Some(uri) = &self.endpoint_uri {
            config.endpoint_uri.clone_from(uri);
        }
    }

    #[must_use]
    pub fn event(&self) -> Event {
        Event::new(self.event_id.clone(), &self.status, &self.message)
    }
}

pub(super) async fn run(global: &GlobalArgs, args: &SendArgs) -> Result<()> {
    let loaded = config::load::<SendConfig>(
        files::SEND,
        global.config.as_deref(),
        &config::search_paths(),
    )?;
    let mut config = loaded.config;
    args.apply(&mut config);
    global.apply_logging(&mut config.logging);
    setup_tracing(&config.logging.level, config.logging.json)?;
    if let Some(path) = &loaded.source {
        tracing::debug!(file = %path.display(), "Using configuration file");
    }

    let sender = EventSender::new(config.endpoint_uri)?;
    sender.send(&args.event()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_flag_overrides_config() {
        let args = SendArgs {
            endpoint_uri: Some("http://dashboard:8080".to_string()),
            ..SendArgs::default()
        };
        let mut config = SendConfig::default();
        args.apply(&mut config);
        assert_eq!(config.endpoint_uri, "http://dashboard:8080");
    }

    #[test]
    fn test_event_from_flags() {
        let args = SendArgs {
            event_id: Some("evt-7".to_string()),
            status: "ok".to_string(),
            message: "done".to_string(),
            ..SendArgs::default()
        };
        assert_eq!(args.event(), Event::new(Some("evt-7".to_string()), "ok", "done"));
    }
}
