//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{Action, Subject};

/// Subject → allowed actions. Used both for a single role's direct grant and
/// for the inheritance-resolved effective set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    grants: BTreeMap<Subject, BTreeSet<Action>>,
}

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single grant. Returns `false` if it was already present.
    pub fn insert(&mut self, action: Action, subject: Subject) -> bool {
        self.grants.entry(subject).or_default().insert(action)
    }

    /// Set union in place.
    pub fn union_with(&mut self, other: &PermissionSet) {
        for (subject, actions) in &other.grants {
            self.grants
                .entry(*subject)
                .or_default()
                .extend(actions.iter().copied());
        }
    }

    /// Whether `action` is granted on `subject`.
    pub fn allows(&self, action: Action, subject: Subject) -> bool {
        self.grants
            .get(&subject)
            .map(|actions| actions.contains(&action))
            .unwrap_or(false)
    }

    /// Actions granted on `subject`, if any.
    pub fn actions(&self, subject: Subject) -> Option<&BTreeSet<Action>> {
        self.grants.get(&subject)
    }

    /// Subjects with at least one granted action.
    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        self.grants
            .iter()
            .filter(|(_, actions)| !actions.is_empty())
            .map(|(subject, _)| *subject)
    }

    /// Every `(subject, action)` pair, ordered by subject then action.
    pub fn iter(&self) -> impl Iterator<Item = (Subject, Action)> + '_ {
        self.grants
            .iter()
            .flat_map(|(subject, actions)| actions.iter().map(move |action| (*subject, *action)))
    }

    /// Whether every grant in `other` is also in `self`.
    pub fn is_superset_of(&self, other: &PermissionSet) -> bool {
        other.iter().all(|(subject, action)| self.allows(action, subject))
    }

    /// Number of `(subject, action)` pairs.
    pub fn len(&self) -> usize {
        self.grants.values().map(BTreeSet::len).sum()
    }

    /// Whether no grant is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(Subject, Action)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Subject, Action)>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for (subject, action) in iter {
            set.insert(action, subject);
        }
        set
    }
}
