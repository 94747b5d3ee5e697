//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
//! Client-side, advisory access control for the admin dashboard.
//!
//! Data flows leaf-first: [`catalog`] → [`expander`] → [`ability`] →
//! [`session`] → [`guard`] / [`navigation`]. None of this is a security
//! boundary; it decides what the UI renders.
#![warn(missing_docs)]

pub mod ability;
pub mod catalog;
pub mod error;
pub mod expander;
pub mod guard;
pub mod identity;
pub mod metrics;
pub mod navigation;
pub mod permission;
pub mod scope;
pub mod session;
pub mod store;

pub use ability::{build_ability, Ability, AbilityResolver};
pub use catalog::{Action, Catalog, CatalogBuilder, CatalogError, Role, Subject};
pub use error::{AccessError, Result};
pub use expander::RoleExpander;
pub use guard::{with_permission, with_role, Gate, Guard, Guarded, RequirePermission, RequireRole};
pub use identity::{LoginRequest, User, UserId};
pub use metrics::{AccessMetrics, CheckKind, SessionEvent};
pub use navigation::{route_decision, sidebar_items, visible_items, NavItem, RouteDecision};
pub use permission::PermissionSet;
pub use scope::{try_use_access, use_access, AccessScope};
pub use session::{AccessControl, RecoveryKind, Session, SessionOptions};
pub use store::{restore_session, FileSessionStore, MemorySessionStore, SessionRecovery, SessionStore};
