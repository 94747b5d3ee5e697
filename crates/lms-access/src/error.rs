//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use thiserror::Error;

use crate::catalog::{CatalogError, Role};

/// Result alias used throughout the access crate.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors raised by session mutations and store access.
///
/// Permission and role checks never return these; they fail closed to `false`.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The session store could not be read or written.
    #[error("session store io error: {0}")]
    Store(#[from] std::io::Error),
    /// A user record could not be encoded or decoded.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Catalog lookup or validation failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The login payload was rejected.
    #[error("invalid login: {0}")]
    InvalidLogin(String),
    /// Store keys are limited to `[A-Za-z0-9._-]`.
    #[error("invalid session store key: {0:?}")]
    InvalidStoreKey(String),
    /// The repair fallback may not grant the admin bypass.
    #[error("role {0} cannot be used as a session fallback")]
    PrivilegedFallback(Role),
    /// A role change attempted to leave the user without roles.
    #[error("role set cannot be empty")]
    EmptyRoleSet,
    /// The operation needs a logged-in user.
    #[error("no user is logged in")]
    NotAuthenticated,
    /// Metric registration failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_display_transparently() {
        let err = AccessError::from(CatalogError::UnknownName {
            kind: "role",
            value: "ROOT".into(),
        });
        assert_eq!(err.to_string(), "unknown role name: \"ROOT\"");
    }

    #[test]
    fn state_errors_have_stable_messages() {
        assert_eq!(AccessError::NotAuthenticated.to_string(), "no user is logged in");
        assert_eq!(AccessError::EmptyRoleSet.to_string(), "role set cannot be empty");
        assert_eq!(
            AccessError::PrivilegedFallback(Role::Admin).to_string(),
            "role ADMIN cannot be used as a session fallback"
        );
    }
}
