//! ---
//! lms_section: "03-logging"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Structured logging adapters and sinks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline tracing subscriber suitable for development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Identifier of the user the event concerns.
    pub user: Option<&'a str>,
    /// Comma separated role names held by the user.
    pub roles: Option<&'a str>,
    /// Session scope label (store key, tab identifier, ...).
    pub session: Option<&'a str>,
    /// Route or UI surface that triggered the event.
    pub route: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a user identifier.
    pub fn with_user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach the rendered role list.
    pub fn with_roles(mut self, roles: &'a str) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Attach a session label.
    pub fn with_session(mut self, session: &'a str) -> Self {
        self.session = Some(session);
        self
    }

    /// Attach a route.
    pub fn with_route(mut self, route: &'a str) -> Self {
        self.route = Some(route);
        self
    }
}

/// Outcome of an access decision reported through [`log_access_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The check or session operation succeeded.
    Granted,
    /// Access was refused or the operation was rejected.
    Denied,
}

impl AccessOutcome {
    /// Stable label used in log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Granted => "granted",
            AccessOutcome::Denied => "denied",
        }
    }
}

impl From<bool> for AccessOutcome {
    fn from(allowed: bool) -> Self {
        if allowed {
            AccessOutcome::Granted
        } else {
            AccessOutcome::Denied
        }
    }
}

/// Emit a standardized access event. Grants log at INFO, denials at WARN.
pub fn log_access_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: AccessOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        AccessOutcome::Granted => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            user = ctx.user.unwrap_or(""),
            roles = ctx.roles.unwrap_or(""),
            session = ctx.session.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            message = %message
        ),
        AccessOutcome::Denied => tracing::event!(
            Level::WARN,
            event,
            outcome = outcome.as_str(),
            user = ctx.user.unwrap_or(""),
            roles = ctx.roles.unwrap_or(""),
            session = ctx.session.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            message = %message
        ),
    }
}
