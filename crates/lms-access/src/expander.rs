//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::collections::{BTreeSet, VecDeque};

use crate::catalog::{Catalog, Role};
use crate::permission::PermissionSet;

/// Resolves roles through the inheritance graph into effective permission sets.
#[derive(Debug, Clone, Copy)]
pub struct RoleExpander<'c> {
    catalog: &'c Catalog,
}

impl<'c> RoleExpander<'c> {
    /// Expander over `catalog`.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// `role` plus every role reachable through inheritance.
    ///
    /// Iterative worklist with a visited set: terminates on cyclic graphs.
    pub fn reachable_roles(&self, role: Role) -> BTreeSet<Role> {
        self.reachable_from([role])
    }

    /// Effective permissions of one role: its own grants unioned with every inherited role's.
    pub fn expand_role(&self, role: Role) -> PermissionSet {
        self.union_grants(&self.reachable_roles(role))
    }

    /// Effective permissions of a role set (union across roles, never intersection).
    pub fn expand_roles(&self, roles: impl IntoIterator<Item = Role>) -> PermissionSet {
        self.union_grants(&self.reachable_from(roles))
    }

    fn reachable_from(&self, roots: impl IntoIterator<Item = Role>) -> BTreeSet<Role> {
        let mut visited = BTreeSet::new();
        let mut worklist: VecDeque<Role> = roots.into_iter().collect();
        while let Some(role) = worklist.pop_front() {
            if !visited.insert(role) {
                continue;
            }
            worklist.extend(
                self.catalog
                    .direct_parents(role)
                    .iter()
                    .copied()
                    .filter(|parent| !visited.contains(parent)),
            );
        }
        visited
    }

    fn union_grants(&self, roles: &BTreeSet<Role>) -> PermissionSet {
        let mut effective = PermissionSet::new();
        for role in roles {
            if let Some(grants) = self.catalog.direct_grants(*role) {
                effective.union_with(grants);
            }
        }
        effective
    }
}

impl Catalog {
    /// Shorthand for [`RoleExpander::expand_role`] over this catalog.
    pub fn expand_role(&self, role: Role) -> PermissionSet {
        RoleExpander::new(self).expand_role(role)
    }
}
