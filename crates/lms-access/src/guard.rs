//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
//! Declarative render gates. Children are closures run only when the gate
//! allows; otherwise the caller's fallback is returned (nothing by default).
use crate::catalog::{Action, Role, Subject};
use crate::scope::use_access;
use crate::session::AccessControl;

/// A predicate over the current session that decides whether content renders.
pub trait Gate {
    /// Whether the gate is open for `access`'s current session.
    fn allows(&self, access: &AccessControl) -> bool;

    /// `children()` when allowed, otherwise `fallback`.
    fn render<T>(
        &self,
        access: &AccessControl,
        children: impl FnOnce() -> T,
        fallback: Option<T>,
    ) -> Option<T>
    where
        Self: Sized,
    {
        if self.allows(access) {
            Some(children())
        } else {
            fallback
        }
    }

    /// [`Gate::render`] against the facade of the enclosing [`crate::AccessScope`].
    ///
    /// Panics outside a scope.
    fn render_in_scope<T>(&self, children: impl FnOnce() -> T, fallback: Option<T>) -> Option<T>
    where
        Self: Sized,
    {
        let access = use_access();
        self.render(&access, children, fallback)
    }
}

/// Opens when the user holds any (default) or all of the listed roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireRole {
    /// Roles to test.
    pub roles: Vec<Role>,
    /// Require every role instead of any.
    pub all: bool,
}

impl RequireRole {
    /// Open when any of `roles` is held.
    pub fn any(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            all: false,
        }
    }

    /// Open only when every one of `roles` is held.
    pub fn all(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            all: true,
        }
    }

    /// Single-role gate.
    pub fn one(role: Role) -> Self {
        Self::any([role])
    }
}

impl Gate for RequireRole {
    fn allows(&self, access: &AccessControl) -> bool {
        if self.all {
            access.has_all_roles(&self.roles)
        } else {
            access.has_any_role(&self.roles)
        }
    }
}

/// Opens when the current ability allows `action` on `subject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirePermission {
    /// Action to check.
    pub action: Action,
    /// Subject the action applies to.
    pub subject: Subject,
}

impl RequirePermission {
    /// Gate on `action` over `subject`.
    pub fn new(action: Action, subject: Subject) -> Self {
        Self { action, subject }
    }
}

impl Gate for RequirePermission {
    fn allows(&self, access: &AccessControl) -> bool {
        access.has_permission(self.action, self.subject)
    }
}

/// Either gate variant, for heterogeneous lists such as navigation tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Role-gated.
    Role(RequireRole),
    /// Permission-gated.
    Permission(RequirePermission),
}

impl From<RequireRole> for Guard {
    fn from(gate: RequireRole) -> Self {
        Guard::Role(gate)
    }
}

impl From<RequirePermission> for Guard {
    fn from(gate: RequirePermission) -> Self {
        Guard::Permission(gate)
    }
}

impl Gate for Guard {
    fn allows(&self, access: &AccessControl) -> bool {
        match self {
            Guard::Role(gate) => gate.allows(access),
            Guard::Permission(gate) => gate.allows(access),
        }
    }
}

/// A component wrapped in a gate.
#[derive(Debug, Clone)]
pub struct Guarded<G, F> {
    gate: G,
    component: F,
}

impl<G: Gate, F> Guarded<G, F> {
    /// Wrap `component` behind `gate`.
    pub fn new(gate: G, component: F) -> Self {
        Self { gate, component }
    }

    /// The wrapping gate.
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Call the component with `props` when allowed, otherwise return `fallback`.
    pub fn render<P, T>(&self, access: &AccessControl, props: P, fallback: Option<T>) -> Option<T>
    where
        F: Fn(P) -> T,
    {
        self.gate.render(access, || (self.component)(props), fallback)
    }

    /// [`Guarded::render`] against the enclosing scope's facade.
    pub fn render_in_scope<P, T>(&self, props: P, fallback: Option<T>) -> Option<T>
    where
        F: Fn(P) -> T,
    {
        self.gate
            .render_in_scope(|| (self.component)(props), fallback)
    }
}

/// Wrap `component` behind a role gate.
pub fn with_role<F>(component: F, gate: RequireRole) -> Guarded<RequireRole, F> {
    Guarded::new(gate, component)
}

/// Wrap `component` behind a permission gate.
pub fn with_permission<F>(
    component: F,
    action: Action,
    subject: Subject,
) -> Guarded<RequirePermission, F> {
    Guarded::new(RequirePermission::new(action, subject), component)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::LoginRequest;
    use crate::scope::AccessScope;

    fn logged_in(roles: &[&str]) -> AccessControl {
        let access = AccessControl::in_memory();
        access
            .login(LoginRequest::new(9u64, "Sam", "sam@example.com").with_roles(roles.iter().copied()))
            .unwrap();
        access
    }

    #[test]
    fn permission_gate_renders_fallback_when_denied() {
        let access = logged_in(&["USER"]);
        let gate = RequirePermission::new(Action::EditRole, Subject::Role);
        assert!(!access.has_permission(Action::EditRole, Subject::Role));
        let rendered = gate.render(&access, || "<X/>", Some("<Y/>"));
        assert_eq!(rendered, Some("<Y/>"));
        assert_eq!(gate.render(&access, || "<X/>", None), None);
    }

    #[test]
    fn children_are_not_evaluated_when_denied() {
        let access = AccessControl::in_memory();
        let rendered = RequireRole::one(Role::User).render(
            &access,
            || -> &'static str { panic!("children rendered without a session") },
            None,
        );
        assert!(rendered.is_none());
    }

    #[test]
    fn role_gate_any_and_all() {
        let access = logged_in(&["MANAGER", "AUDITOR"]);
        assert!(RequireRole::any([Role::Admin, Role::Auditor]).allows(&access));
        assert!(RequireRole::all([Role::Manager, Role::Auditor]).allows(&access));
        assert!(!RequireRole::all([Role::Manager, Role::Admin]).allows(&access));
        assert!(!RequireRole::one(Role::User).allows(&access));
    }

    #[test]
    fn guard_enum_dispatches() {
        let access = logged_in(&["AUDITOR"]);
        let guards: Vec<Guard> = vec![
            RequireRole::one(Role::Auditor).into(),
            RequirePermission::new(Action::ViewAuditLogs, Subject::Audit).into(),
            RequirePermission::new(Action::DeleteCourse, Subject::Course).into(),
        ];
        let open: Vec<bool> = guards.iter().map(|guard| guard.allows(&access)).collect();
        assert_eq!(open, vec![true, true, false]);
    }

    #[test]
    fn wrapped_components_receive_props() {
        let admin = logged_in(&["ADMIN"]);
        let user = logged_in(&["USER"]);
        let page = with_role(
            |title: &str| format!("<RoleManagement title={title}/>"),
            RequireRole::one(Role::Admin),
        );
        assert_eq!(
            page.render(&admin, "Roles", None),
            Some("<RoleManagement title=Roles/>".to_owned())
        );
        assert_eq!(
            page.render(&user, "Roles", Some("<Denied/>".to_owned())),
            Some("<Denied/>".to_owned())
        );

        let upload = with_permission(|n: u32| n * 2, Action::UploadContent, Subject::Content);
        assert_eq!(upload.render(&user, 21, None), None);
        assert_eq!(upload.render(&admin, 21, None), Some(42));
    }

    #[test]
    fn scoped_render_uses_enclosing_facade() {
        let access = Arc::new(logged_in(&["PARTNER"]));
        let rendered = AccessScope::with(access, || {
            RequirePermission::new(Action::EnrollCourse, Subject::Course)
                .render_in_scope(|| "enroll", Some("locked"))
        });
        assert_eq!(rendered, Some("enroll"));
    }
}
