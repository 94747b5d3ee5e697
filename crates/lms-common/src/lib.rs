//! ---
//! lms_section: "01-core-functionality"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Shared primitives and utilities for the admin runtime."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
//! Shared primitives for the LMS admin workspace.
//! This crate exposes configuration loading and tracing bootstrap
//! consumed by the access core and the admin CLI.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, SessionConfig};
pub use logging::{filter_directive, init_tracing, log_file_name, LogFormat, DEFAULT_DIRECTIVE};
