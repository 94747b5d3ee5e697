//! ---
//! lms_section: "05-external-interfaces"
//! lms_subsection: "binary"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Control CLI for administrators inspecting LMS access control."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use lms_common::{AppConfig, LoadedAppConfig};
use lms_logging as logging;

mod catalog;
mod session;

const DEFAULT_CONFIG_PATH: &str = "configs/lms.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "LMS admin dashboard access-control utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to configs/lms.toml when present).
    #[arg(long, global = true, value_name = "FILE", env = AppConfig::ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Write logs to the configured rolling file as well as stdout.
    #[arg(long = "log-file", global = true, action = ArgAction::SetTrue)]
    log_file: bool,

    /// Emit JSON instead of tables.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List catalog roles with their parents.
    Roles,
    /// Show the effective permission set of a role.
    Expand(catalog::ExpandCommand),
    /// Decide whether a role set may perform an action on a subject.
    Check(catalog::CheckCommand),
    #[command(subcommand, about = "Inspect or change the persisted session")]
    Session(session::SessionCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_ref())?;
    if cli.log_file {
        lms_common::init_tracing("lms-adminctl", &loaded.config.logging)?;
    } else {
        logging::init();
    }
    if let Some(source) = &loaded.source {
        logging::lms_debug!("configuration loaded from {}", source.display());
    }

    let output = Output { json: cli.json };
    match cli.command {
        Commands::Roles => catalog::roles(output)?,
        Commands::Expand(cmd) => cmd.execute(output)?,
        Commands::Check(cmd) => cmd.execute(output)?,
        Commands::Session(cmd) => session::run(cmd, &loaded.config, output)?,
    }
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<LoadedAppConfig> {
    match explicit {
        Some(path) => AppConfig::load_with_source(&[path]),
        None => AppConfig::load_or_default(&[DEFAULT_CONFIG_PATH]),
    }
}

/// Output mode shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as pretty JSON when requested, otherwise run `table`.
    pub fn emit(&self, value: &serde_json::Value, table: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_with_repeated_roles() {
        let cli = Cli::try_parse_from([
            "lms-adminctl",
            "check",
            "--role",
            "MANAGER",
            "--role",
            "AUDITOR",
            "view_audit_logs",
            "audit",
        ])
        .unwrap();
        match cli.command {
            Commands::Check(cmd) => assert_eq!(cmd.roles.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
