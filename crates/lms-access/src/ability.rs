//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use tracing::debug;

use crate::catalog::{Action, Catalog, Role, Subject};
use crate::expander::RoleExpander;
use crate::permission::PermissionSet;

/// Queryable permission object for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Ability {
    /// No roles: every check is denied.
    #[default]
    Guest,
    /// ADMIN held: every check is granted, including names outside the catalog.
    Wildcard,
    /// Effective permissions resolved from the catalog.
    Granted(PermissionSet),
}

impl Ability {
    /// Whether `action` may be performed on `subject`.
    pub fn can(&self, action: Action, subject: Subject) -> bool {
        match self {
            Ability::Guest => false,
            Ability::Wildcard => true,
            Ability::Granted(set) => set.allows(action, subject),
        }
    }

    /// Like [`Ability::can`] for untyped names. Unrecognised names are denied,
    /// except under [`Ability::Wildcard`].
    pub fn can_named(&self, action: &str, subject: &str) -> bool {
        if let Ability::Wildcard = self {
            return true;
        }
        match (Action::parse(action), Subject::parse(subject)) {
            (Ok(action), Ok(subject)) => self.can(action, subject),
            _ => {
                debug!(action, subject, "permission check with unknown names denied");
                false
            }
        }
    }

    /// Whether this ability bypasses the catalog.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Ability::Wildcard)
    }

    /// Resolved permission set, when the ability is catalog-backed.
    pub fn permissions(&self) -> Option<&PermissionSet> {
        match self {
            Ability::Granted(set) => Some(set),
            Ability::Guest | Ability::Wildcard => None,
        }
    }
}

/// Builds [`Ability`] values from role sets against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct AbilityResolver<'c> {
    expander: RoleExpander<'c>,
}

impl<'c> AbilityResolver<'c> {
    /// Resolver over `catalog`.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            expander: RoleExpander::new(catalog),
        }
    }

    /// Build the ability for `roles`. Pure: equal inputs give equal abilities.
    pub fn build(&self, roles: &[Role]) -> Ability {
        if roles.is_empty() {
            return Ability::Guest;
        }
        // Checked before any catalog lookup so catalog edits cannot narrow it.
        if roles.contains(&Role::Admin) {
            return Ability::Wildcard;
        }
        Ability::Granted(self.expander.expand_roles(roles.iter().copied()))
    }
}

/// Shorthand for [`AbilityResolver::build`].
pub fn build_ability(catalog: &Catalog, roles: &[Role]) -> Ability {
    AbilityResolver::new(catalog).build(roles)
}
