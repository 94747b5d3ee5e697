//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};
use strum::IntoStaticStr;

use crate::error::Result;

/// Which facade check produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    /// `has_role`, `has_any_role` or `has_all_roles`.
    Role,
    /// `has_permission` or `has_permission_named`.
    Permission,
}

/// Session lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionEvent {
    /// A user logged in.
    Login,
    /// The session was cleared.
    Logout,
    /// The current user's roles were replaced.
    RoleChange,
    /// A damaged stored session was repaired or discarded.
    Recovered,
}

/// Access-control metrics exported via Prometheus.
#[derive(Clone)]
pub struct AccessMetrics {
    registry: Arc<Registry>,
    checks_total: IntCounterVec,
    session_events_total: IntCounterVec,
}

impl AccessMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let checks_total = IntCounterVec::new(
            Opts::new("lms_access_checks_total", "Role and permission checks by outcome"),
            &["kind", "outcome"],
        )?;
        let session_events_total = IntCounterVec::new(
            Opts::new("lms_session_events_total", "Session lifecycle transitions"),
            &["event"],
        )?;

        registry.register(Box::new(checks_total.clone()))?;
        registry.register(Box::new(session_events_total.clone()))?;

        Ok(Self {
            registry,
            checks_total,
            session_events_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count one check decision.
    pub fn record_check(&self, kind: CheckKind, granted: bool) {
        let outcome = if granted { "granted" } else { "denied" };
        self.checks_total
            .with_label_values(&[kind.into(), outcome])
            .inc();
    }

    /// Count one session transition.
    pub fn record_session_event(&self, event: SessionEvent) {
        self.session_events_total
            .with_label_values(&[event.into()])
            .inc();
    }

    /// Current value of a check counter.
    pub fn checks(&self, kind: CheckKind, granted: bool) -> u64 {
        let outcome = if granted { "granted" } else { "denied" };
        self.checks_total
            .with_label_values(&[kind.into(), outcome])
            .get()
    }

    /// Current value of a session event counter.
    pub fn session_events(&self, event: SessionEvent) -> u64 {
        self.session_events_total
            .with_label_values(&[event.into()])
            .get()
    }
}
