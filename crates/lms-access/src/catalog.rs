//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::permission::PermissionSet;

/// Operations the dashboard can gate. The set is closed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Browse the course catalogue.
    ViewCourse,
    /// Enrol in a course.
    EnrollCourse,
    /// Create a new course.
    CreateCourse,
    /// Edit course details.
    EditCourse,
    /// Remove a course.
    DeleteCourse,
    /// Invite or create a user account.
    AddUser,
    /// Edit a user profile.
    EditUser,
    /// Deactivate a user account.
    DeactivateUser,
    /// Browse user accounts.
    ViewUser,
    /// Upload course content.
    UploadContent,
    /// Approve uploaded content for publication.
    ApproveContent,
    /// Remove content.
    DeleteContent,
    /// Read content.
    ViewContent,
    /// Read reports.
    ViewReports,
    /// Export reports.
    ExportReports,
    /// Generate new reports.
    GenerateReports,
    /// Change system-wide settings.
    ConfigureSystem,
    /// Manage third-party integrations.
    ManageIntegrations,
    /// Manage notification channels.
    ManageNotifications,
    /// Define a new role.
    CreateRole,
    /// Change a role's grants.
    EditRole,
    /// Remove a role.
    DeleteRole,
    /// Assign roles to users.
    AssignRole,
    /// Inspect role definitions.
    ViewRole,
    /// Read the audit trail.
    ViewAuditLogs,
    /// Manage partner organisations.
    ManagePartners,
    /// Approve partner access requests.
    ApprovePartnerAccess,
    /// Revoke partner access.
    RevokePartnerAccess,
}

/// Resource categories actions apply to. The set is closed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Subject {
    /// Courses.
    Course,
    /// User accounts.
    User,
    /// Course content.
    Content,
    /// Reports.
    Report,
    /// System settings.
    System,
    /// Role definitions.
    Role,
    /// Audit trail.
    Audit,
    /// Partner organisations.
    Partner,
}

/// Roles a user can hold. Declaration order is the display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access; bypasses the catalog entirely.
    Admin,
    /// Course and user management.
    Manager,
    /// Read-only reporting and audit access.
    Auditor,
    /// External partner organisation member.
    Partner,
    /// Baseline learner account.
    User,
}

macro_rules! impl_named {
    ($ty:ty, $kind:literal) => {
        impl $ty {
            /// Parse a wire name, reporting unknown names as [`CatalogError::UnknownName`].
            pub fn parse(name: &str) -> Result<Self, CatalogError> {
                name.trim()
                    .parse()
                    .map_err(|_| CatalogError::UnknownName {
                        kind: $kind,
                        value: name.to_owned(),
                    })
            }

            /// Stable wire name.
            pub fn as_str(&self) -> &'static str {
                self.into()
            }
        }
    };
}

impl_named!(Action, "action");
impl_named!(Subject, "subject");
impl_named!(Role, "role");

/// Errors raised while building, validating, or reading catalog names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The inheritance graph contains a cycle; the path starts and ends on the same role.
    #[error("role inheritance cycle: {}", render_path(.0))]
    Cycle(Vec<Role>),
    /// A name did not match any member of the closed enumeration.
    #[error("unknown {kind} name: {value:?}")]
    UnknownName {
        /// Which enumeration was consulted.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

fn render_path(path: &[Role]) -> String {
    path.iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Immutable role → grant table plus the role inheritance edges.
///
/// Grants are stored per role as declared; inherited grants are never folded
/// in here. See [`crate::expander::RoleExpander`] for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    grants: BTreeMap<Role, PermissionSet>,
    hierarchy: BTreeMap<Role, Vec<Role>>,
}

static STANDARD: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(standard_catalog()));

impl Catalog {
    /// Start an empty catalog definition.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The catalog shipped with the dashboard. Built once per process.
    pub fn standard() -> Arc<Catalog> {
        STANDARD.clone()
    }

    /// Every role mentioned by either table, in declaration order.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: BTreeSet<Role> = self.grants.keys().copied().collect();
        for (role, parents) in &self.hierarchy {
            roles.insert(*role);
            roles.extend(parents.iter().copied());
        }
        roles.into_iter().collect()
    }

    /// Grants declared on `role` itself. `None` means the role declares nothing.
    pub fn direct_grants(&self, role: Role) -> Option<&PermissionSet> {
        self.grants.get(&role)
    }

    /// Roles `role` inherits from directly. Unknown roles are leaves.
    pub fn direct_parents(&self, role: Role) -> &[Role] {
        self.hierarchy
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `role` itself (ignoring inheritance) grants `action` on `subject`.
    pub fn grants_directly(&self, role: Role, action: Action, subject: Subject) -> bool {
        self.direct_grants(role)
            .map(|grants| grants.allows(action, subject))
            .unwrap_or(false)
    }

    /// Check that the inheritance graph is acyclic.
    ///
    /// Expansion is cycle-safe regardless; this exists so a broken catalog is
    /// reported rather than silently tolerated.
    pub fn validate(&self) -> Result<(), CatalogError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<Role, Mark> = HashMap::new();
        for &start in self.hierarchy.keys() {
            if marks.contains_key(&start) {
                continue;
            }
            // Explicit DFS stack of (role, index of next parent to visit).
            let mut path: Vec<(Role, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Visiting);
            while let Some(&(role, index)) = path.last() {
                let parents = self.direct_parents(role);
                let Some(&next) = parents.get(index) else {
                    marks.insert(role, Mark::Done);
                    path.pop();
                    continue;
                };
                if let Some(top) = path.last_mut() {
                    top.1 += 1;
                }
                match marks.get(&next) {
                    Some(Mark::Visiting) => {
                        let mut cycle: Vec<Role> = path
                            .iter()
                            .map(|(role, _)| *role)
                            .skip_while(|role| *role != next)
                            .collect();
                        cycle.push(next);
                        tracing::warn!(cycle = %render_path(&cycle), "role inheritance cycle detected");
                        return Err(CatalogError::Cycle(cycle));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Visiting);
                        path.push((next, 0));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Incremental builder for [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    grants: BTreeMap<Role, PermissionSet>,
    hierarchy: BTreeMap<Role, Vec<Role>>,
}

impl CatalogBuilder {
    /// Grant `actions` on `subject` to `role`. Repeated grants accumulate.
    pub fn grant(
        mut self,
        role: Role,
        subject: Subject,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        let set = self.grants.entry(role).or_default();
        for action in actions {
            set.insert(action, subject);
        }
        self
    }

    /// Declare that `role` inherits from each of `parents`.
    pub fn inherits(mut self, role: Role, parents: impl IntoIterator<Item = Role>) -> Self {
        let edges = self.hierarchy.entry(role).or_default();
        for parent in parents {
            if !edges.contains(&parent) {
                edges.push(parent);
            }
        }
        self
    }

    /// Finish the catalog. Cycles are accepted here; see [`Catalog::validate`].
    pub fn build(self) -> Catalog {
        Catalog {
            grants: self.grants,
            hierarchy: self.hierarchy,
        }
    }
}

fn standard_catalog() -> Catalog {
    use Action::*;

    Catalog::builder()
        .inherits(Role::Admin, [Role::Manager, Role::User])
        .inherits(Role::Manager, [Role::User])
        .inherits(Role::Auditor, [Role::User])
        .inherits(Role::Partner, [])
        .inherits(Role::User, [])
        // ADMIN
        .grant(
            Role::Admin,
            Subject::Course,
            [ViewCourse, EnrollCourse, CreateCourse, EditCourse, DeleteCourse],
        )
        .grant(
            Role::Admin,
            Subject::User,
            [ViewUser, AddUser, EditUser, DeactivateUser, AssignRole],
        )
        .grant(
            Role::Admin,
            Subject::Content,
            [ViewContent, UploadContent, ApproveContent, DeleteContent],
        )
        .grant(
            Role::Admin,
            Subject::Report,
            [ViewReports, ExportReports, GenerateReports],
        )
        .grant(
            Role::Admin,
            Subject::System,
            [ConfigureSystem, ManageIntegrations, ManageNotifications],
        )
        .grant(
            Role::Admin,
            Subject::Role,
            [ViewRole, CreateRole, EditRole, DeleteRole, AssignRole],
        )
        .grant(Role::Admin, Subject::Audit, [ViewAuditLogs])
        .grant(
            Role::Admin,
            Subject::Partner,
            [ManagePartners, ApprovePartnerAccess, RevokePartnerAccess],
        )
        // MANAGER
        .grant(
            Role::Manager,
            Subject::Course,
            [ViewCourse, EnrollCourse, CreateCourse, EditCourse],
        )
        .grant(Role::Manager, Subject::User, [ViewUser, AddUser, EditUser])
        .grant(
            Role::Manager,
            Subject::Content,
            [ViewContent, UploadContent, ApproveContent],
        )
        .grant(Role::Manager, Subject::Report, [ViewReports, ExportReports])
        .grant(
            Role::Manager,
            Subject::Partner,
            [ManagePartners, ApprovePartnerAccess],
        )
        // AUDITOR
        .grant(Role::Auditor, Subject::Course, [ViewCourse])
        .grant(Role::Auditor, Subject::User, [ViewUser])
        .grant(Role::Auditor, Subject::Content, [ViewContent])
        .grant(
            Role::Auditor,
            Subject::Report,
            [ViewReports, ExportReports, GenerateReports],
        )
        .grant(Role::Auditor, Subject::Audit, [ViewAuditLogs])
        // PARTNER
        .grant(Role::Partner, Subject::Course, [ViewCourse, EnrollCourse])
        .grant(Role::Partner, Subject::Content, [ViewContent])
        // USER
        .grant(Role::User, Subject::Course, [ViewCourse, EnrollCourse])
        .grant(Role::User, Subject::Content, [ViewContent])
        .build()
}
