// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use clap::Args;

use crate::build_info::{BuildInfo, executable_name};
use crate::error::Result;

#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Print as JSON
    #[arg(short = 'j', long)]
    pub json: bool,
}

pub(super) fn render(build: &BuildInfo, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(build)?)
    } else {
        Ok(build.text())
    }
}

pub(super) fn run(args: &VersionArgs) -> Result<()> {
    let build = BuildInfo::current();
    tracing::debug!(executable = %executable_name(), "Printing build information");
    println!("{}", render(&build, args.json)?.trim_end());
    Ok(())
}
