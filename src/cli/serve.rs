// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::process::ExitCode;

use clap::Args;
use tracing::Instrument;

use super::GlobalArgs;
use crate::build_info::BuildInfo;
use crate::config::{self, ServeConfig, env_vars, files};
use crate::error::Result;
use crate::health::HealthState;
use crate::logging::setup_tracing;
use crate::metrics::MetricsRegistry;
use crate::orchestrator::{Orchestrator, OsSignals};

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address both services bind to
    #[arg(short = 'a', long, env = env_vars::BIND_ADDRESS)]
    pub address: Option<String>,

    #[arg(short = 'p', long, env = env_vars::WEB_PORT)]
    pub web_port: Option<u16>,

    #[arg(short = 'm', long, env = env_vars::METRICS_PORT)]
    pub metrics_port: Option<u16>,

    /// Comma separated IPs or CIDRs trusted to forward the client address
    #[arg(long, env = env_vars::PROXIES, value_delimiter = ',')]
    pub proxies: Option<Vec<String>>,

    /// Seconds allowed to receive request headers
    #[arg(long, env = env_vars::HEADERS_TIMEOUT)]
    pub headers_timeout: Option<u64>,

    /// Seconds allowed to receive the request body
    #[arg(long, env = env_vars::READ_TIMEOUT)]
    pub read_timeout: Option<u64>,

    /// Seconds allowed to produce a response
    #[arg(long, env = env_vars::WRITE_TIMEOUT)]
    pub write_timeout: Option<u64>,

    /// Seconds a keep-alive connection may stay idle
    #[arg(long, env = env_vars::IDLE_TIMEOUT)]
    pub idle_timeout: Option<u64>,

    /// Seconds the web service gets to drain on shutdown
    #[arg(long, env = env_vars::SHUTDOWN_TIMEOUT)]
    pub shutdown_timeout: Option<u64>,

    #[arg(long, env = env_vars::CLUSTER_NAME)]
    pub cluster_name: Option<String>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut ServeConfig) {
        let endpoints = &mut config.endpoints;
        if let Some(address) = &self.address {
            endpoints.bind.address.clone_from(address);
        }
        if let Some(port) = self.web_port {
            endpoints.bind.port.web = port;
        }
        if let Some(port) = self.metrics_port {
            endpoints.bind.port.metrics = port;
        }
        if let Some(proxies) = &self.proxies {
            endpoints.proxies = proxies
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }

        let timeouts = &mut endpoints.timeouts;
        for (flag, value) in [
            (self.headers_timeout, &mut timeouts.headers),
            (self.read_timeout, &mut timeouts.read),
            (self.write_timeout, &mut timeouts.write),
            (self.idle_timeout, &mut timeouts.idle),
            (self.shutdown_timeout, &mut timeouts.shutdown),
        ] {
            if let Some(flag) = flag {
                *value = flag;
            }
        }

        if let Some(name) = &self.cluster_name {
            config.cluster.name.clone_from(name);
        }
    }
}

pub(super) async fn run(global: &GlobalArgs, args: &ServeArgs) -> Result<ExitCode> {
    let config::Loaded {
        config: mut config,
        source,
    } = config::load::<ServeConfig>(
        files::SERVE,
        global.config.as_deref(),
        &config::search_paths(),
    )?;
    args.apply(&mut config);
    global.apply_logging(&mut config.logging);
    setup_tracing(&config.logging.level, config.logging.json)?;
    let signals = OsSignals::install()?;

    let build = BuildInfo::current();
    let span = tracing::info_span!(
        "application",
        name = build.application,
        version = build.version,
        commit = build.commit,
        arch = build.arch,
        build_date = build.build_date,
    );

    let code = async move {
        match &source {
            Some(path) => tracing::info!(file = %path.display(), "Using configuration file"),
            None => tracing::debug!("No configuration file found, using defaults"),
        }

        let registry = MetricsRegistry::new();
        registry.record_build_info(&build);

        let orchestrator = Orchestrator::new(&config, HealthState::new(), registry);
        let outcome = orchestrator.run(signals).await;

        if outcome.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
    .instrument(span)
    .await;

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn parse(args: &[&str]) -> ServeArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Serve(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = ServeConfig::default();
        ServeArgs::default().apply(&mut config);
        assert_eq!(config, ServeConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "dashboard",
            "serve",
            "-a",
            "0.0.0.0",
            "-p",
            "9080",
            "-m",
            "9888",
            "--proxies",
            "10.0.0.0/8, 192.168.0.0/16",
            "--write-timeout",
            "0",
            "--shutdown-timeout",
            "60",
            "--cluster-name",
            "staging",
        ]);

        let mut config = ServeConfig::default();
        args.apply(&mut config);

        assert_eq!(config.endpoints.bind.address, "0.0.0.0");
        assert_eq!(config.endpoints.bind.port.web, 9080);
        assert_eq!(config.endpoints.bind.port.metrics, 9888);
        assert_eq!(config.endpoints.proxies, vec!["10.0.0.0/8", "192.168.0.0/16"]);
        assert_eq!(config.endpoints.timeouts.write, 0);
        assert_eq!(config.endpoints.timeouts.shutdown, 60);
        assert_eq!(config.endpoints.timeouts.read, 5);
        assert_eq!(config.cluster.name, "staging");
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            config: Some(dir.path().join("missing.yaml")),
            ..GlobalArgs::default()
        };

        let result = run(&global, &ServeArgs::default()).await;
        assert!(matches!(result, Err(crate::error::AppError::Config(_))));
    }
}
