//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use lms_logging::{log_access_event, AccessOutcome, LogContext};
use once_cell::sync::Lazy;

use crate::catalog::Role;
use crate::guard::{Gate, Guard, RequireRole};
use crate::session::AccessControl;

/// Routes reachable without a session.
const PUBLIC_ROUTES: &[&str] = &["/login", "/register"];

/// One sidebar entry. Entries without a gate need only an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    /// Label shown in the sidebar.
    pub name: &'static str,
    /// Route the entry links to.
    pub href: &'static str,
    /// Extra gate beyond authentication.
    pub gate: Option<Guard>,
}

impl NavItem {
    fn open(name: &'static str, href: &'static str) -> Self {
        Self {
            name,
            href,
            gate: None,
        }
    }

    fn gated(name: &'static str, href: &'static str, gate: impl Into<Guard>) -> Self {
        Self {
            name,
            href,
            gate: Some(gate.into()),
        }
    }

    /// Whether the entry is shown for `access`.
    pub fn visible_to(&self, access: &AccessControl) -> bool {
        access.is_authenticated()
            && self
                .gate
                .as_ref()
                .map(|gate| gate.allows(access))
                .unwrap_or(true)
    }
}

static SIDEBAR: Lazy<Vec<NavItem>> = Lazy::new(|| {
    vec![
        NavItem::open("Overview", "/"),
        NavItem::open("Courses", "/products"),
        NavItem::open("Users", "/users"),
        NavItem::open("Sales", "/sales"),
        NavItem::open("Orders", "/orders"),
        NavItem::open("Analytics", "/analytics"),
        NavItem::open("Settings", "/settings"),
        NavItem::gated("Role Management", "/roles", RequireRole::one(Role::Admin)),
    ]
});

/// The full dashboard sidebar in display order.
pub fn sidebar_items() -> &'static [NavItem] {
    &SIDEBAR
}

/// Sidebar entries visible to the current session. Empty when logged out.
pub fn visible_items(access: &AccessControl) -> Vec<&'static NavItem> {
    sidebar_items()
        .iter()
        .filter(|item| item.visible_to(access))
        .collect()
}

/// Outcome of navigating to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Reachable without a session.
    Public,
    /// Render the page.
    Allowed,
    /// No session: send the user to `/login`.
    RedirectToLogin,
    /// Authenticated, but the route's gate is closed.
    Forbidden,
}

/// Decide what happens when the dashboard navigates to `path`.
///
/// A gated entry also covers every route below it (`/roles/edit` is gated like
/// `/roles`). Unknown paths inside the dashboard shell are allowed for any session.
pub fn route_decision(access: &AccessControl, path: &str) -> RouteDecision {
    let path = normalize(path);
    if PUBLIC_ROUTES.contains(&path.as_str()) {
        return RouteDecision::Public;
    }

    let user = access.current_user();
    let id = user.as_ref().map(|user| user.id.to_string()).unwrap_or_default();
    let roles = user.as_ref().map(|user| user.role_names()).unwrap_or_default();
    let ctx = LogContext::new()
        .with_user(&id)
        .with_roles(&roles)
        .with_route(&path);

    if user.is_none() {
        log_access_event(Some(&ctx), "route.check", "no session", AccessOutcome::Denied);
        return RouteDecision::RedirectToLogin;
    }

    let closed = sidebar_items()
        .iter()
        .filter(|item| covers(item.href, &path))
        .filter_map(|item| item.gate.as_ref())
        .any(|gate| !gate.allows(access));
    if closed {
        log_access_event(Some(&ctx), "route.check", "route gate closed", AccessOutcome::Denied);
        return RouteDecision::Forbidden;
    }
    RouteDecision::Allowed
}

/// Whether the sidebar entry at `href` governs `path`. The root only covers itself.
fn covers(href: &str, path: &str) -> bool {
    if href == "/" {
        return path == "/";
    }
    path.strip_prefix(href)
        .map(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(false)
}

/// Drop query and fragment, collapse repeated slashes and strip the trailing one.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LoginRequest;

    fn logged_in(roles: &[&str]) -> AccessControl {
        let access = AccessControl::in_memory();
        access
            .login(LoginRequest::new("u-1", "Kim", "kim@example.com").with_roles(roles.iter().copied()))
            .unwrap();
        access
    }

    #[test]
    fn sidebar_matches_dashboard_layout() {
        let hrefs: Vec<&str> = sidebar_items().iter().map(|item| item.href).collect();
        assert_eq!(
            hrefs,
            vec!["/", "/products", "/users", "/sales", "/orders", "/analytics", "/settings", "/roles"]
        );
    }

    #[test]
    fn role_management_is_admin_only() {
        let admin = logged_in(&["ADMIN"]);
        let manager = logged_in(&["MANAGER"]);
        assert_eq!(visible_items(&admin).len(), 8);
        let names: Vec<&str> = visible_items(&manager).iter().map(|item| item.name).collect();
        assert_eq!(names.len(), 7);
        assert!(!names.contains(&"Role Management"));
    }

    #[test]
    fn logged_out_sees_nothing() {
        let access = AccessControl::in_memory();
        assert!(visible_items(&access).is_empty());
        assert_eq!(route_decision(&access, "/users"), RouteDecision::RedirectToLogin);
        assert_eq!(route_decision(&access, "/login"), RouteDecision::Public);
        assert_eq!(route_decision(&access, "/register/"), RouteDecision::Public);
    }

    #[test]
    fn route_decisions_follow_gates() {
        let user = logged_in(&["USER"]);
        assert_eq!(route_decision(&user, "/"), RouteDecision::Allowed);
        assert_eq!(route_decision(&user, "/settings?tab=security"), RouteDecision::Allowed);
        assert_eq!(route_decision(&user, "/roles"), RouteDecision::Forbidden);
        assert_eq!(route_decision(&user, "/roles/"), RouteDecision::Forbidden);
        assert_eq!(route_decision(&user, "/unknown"), RouteDecision::Allowed);

        let admin = logged_in(&["ADMIN"]);
        assert_eq!(route_decision(&admin, "/roles"), RouteDecision::Allowed);
    }

    #[test]
    fn gated_routes_cover_nested_and_doubled_paths() {
        let user = logged_in(&["USER"]);
        for path in ["/roles/edit", "//roles", "/roles//", "///roles/42/assign?x=1"] {
            assert_eq!(route_decision(&user, path), RouteDecision::Forbidden, "path {path}");
        }
        assert_eq!(route_decision(&user, "/rolesets"), RouteDecision::Allowed);
        assert_eq!(route_decision(&user, "//login"), RouteDecision::Public);

        let admin = logged_in(&["ADMIN"]);
        assert_eq!(route_decision(&admin, "/roles/edit"), RouteDecision::Allowed);
    }

    #[test]
    fn normalize_collapses_slashes() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("//"), "/");
        assert_eq!(normalize("//roles///edit/?tab=1"), "/roles/edit");
        assert_eq!(normalize("/settings#top"), "/settings");
    }
}
