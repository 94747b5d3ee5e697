//! ---
//! lms_section: "01-core-functionality"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Shared primitives and utilities for the admin runtime."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "LMS_LOG";

/// Access denials are logged at DEBUG by `lms_access`; keep them in the file by default.
pub const DEFAULT_DIRECTIVE: &str = "info,lms_access=debug";

static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Available log formats for the console.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Pick the filter directive: `LMS_LOG`, then `[logging] filter`, then `RUST_LOG`,
/// then [`DEFAULT_DIRECTIVE`]. Blank values are skipped.
pub fn filter_directive(
    lms_log: Option<String>,
    config: &LoggingConfig,
    rust_log: Option<String>,
) -> String {
    [lms_log, config.filter.clone(), rust_log]
        .into_iter()
        .flatten()
        .map(|directive| directive.trim().to_owned())
        .find(|directive| !directive.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_owned())
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive {directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

/// File name of the rolling access log, `<prefix>-<service>.log`.
pub fn log_file_name(service_name: &str, config: &LoggingConfig) -> String {
    let prefix = config.file_prefix.as_deref().unwrap_or("lms-access");
    format!("{prefix}-{service_name}.log")
}

/// Install console and daily rolling JSON file logging for an admin tool.
///
/// The file always carries JSON with targets so access events can be filtered
/// by `lms_access`; the console follows `config.format`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let file_appender = daily(&config.directory, log_file_name(service_name, config));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = GUARDS.set([file_guard, stdout_guard]);

    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        config,
        std::env::var("RUST_LOG").ok(),
    );

    let console = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(build_filter(&directive))
        .with(console)
        .with(file)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        filter = %directive,
        "access logging initialised"
    );
    Ok(())
}
