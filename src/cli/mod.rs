// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Command-line interface
//!
//! Every flag can also be given through its `DASHBOARD_*` environment
//! variable; flags win over the environment, which wins over the
//! configuration file.

mod send;
mod serve;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::config::env_vars;
use crate::error::Result;

pub use send::SendArgs;
pub use serve::ServeArgs;
pub use version::VersionArgs;

#[derive(Debug, Parser)]
#[command(name = "dashboard", version, about = "Web dashboard backend")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every command
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Log level: debug, info, warning or error
    #[arg(short = 'l', long, global = true, env = env_vars::LOGGING_LEVEL)]
    pub log_level: Option<String>,

    /// Log as JSON instead of text
    #[arg(long, global = true, env = env_vars::LOGGING_JSON)]
    pub log_json: Option<bool>,

    /// Configuration file, instead of searching the default locations
    #[arg(short = 'c', long, global = true, env = env_vars::CONFIG)]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    fn apply_logging(&self, logging: &mut crate::config::LoggingConfig) {
        if let Some(level) = &self.log_level {
            logging.level.clone_from(level);
        }
        if let Some(json) = self.log_json {
            logging.json = json;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web and metrics services
    Serve(ServeArgs),
    /// Send an event to a running dashboard
    Send(SendArgs),
    /// Print build information
    #[command(visible_alias = "v")]
    Version(VersionArgs),
}

/// Run the selected command and return the process exit code
pub async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Serve(args) => serve::run(&cli.global, &args).await,
        Command::Send(args) => {
            send::run(&cli.global, &args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Version(args) => {
            version::run(&args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dashboard",
            "serve",
            "-l",
            "debug",
            "-c",
            "/tmp/serve.yaml",
        ])
        .unwrap();
        assert_eq!(cli.global.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/serve.yaml")));
        assert!(matches!(cli.command, Command::Serve(_)));
    }

    #[test]
    fn test_version_alias() {
        let cli = Cli::try_parse_from(["dashboard", "v", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Version(VersionArgs { json: true })));
    }

    #[test]
    fn test_global_logging_overrides() {
        let global = GlobalArgs {
            log_level: Some("error".to_string()),
            log_json: Some(false),
            config: None,
        };
        let mut logging = crate::config::LoggingConfig::default();
        global.apply_logging(&mut logging);
        assert_eq!(logging.level, "error");
        assert!(!logging.json);
    }
}
