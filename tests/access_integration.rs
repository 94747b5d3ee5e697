//! ---
//! lms_section: "15-testing-qa-runbook"
//! lms_subsection: "integration-tests"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Integration and validation tests for the LMS access stack."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::sync::Arc;

use lms_access::{
    build_ability, route_decision, visible_items, with_permission, AccessControl, AccessMetrics,
    AccessScope, Action, Catalog, CheckKind, Gate, LoginRequest, MemorySessionStore,
    PermissionSet, RequirePermission, RequireRole, Role, RouteDecision, SessionOptions, Subject,
};
use strum::IntoEnumIterator;

fn session_with(roles: &[&str]) -> AccessControl {
    let access = AccessControl::in_memory();
    access
        .login(
            LoginRequest::new(1u64, "Test User", "test@example.com")
                .with_roles(roles.iter().copied()),
        )
        .unwrap();
    access
}

#[test]
fn inheritance_never_narrows_permissions() {
    let catalog = Catalog::standard();
    for role in Role::iter() {
        for parent in catalog.direct_parents(role) {
            assert!(catalog
                .expand_role(role)
                .is_superset_of(&catalog.expand_role(*parent)));
        }
    }
}

#[test]
fn admin_wildcard_covers_every_pair_and_unknown_names() {
    let ability = build_ability(&Catalog::standard(), &[Role::Admin]);
    for action in Action::iter() {
        for subject in Subject::iter() {
            assert!(ability.can(action, subject), "{action} on {subject}");
        }
    }
    assert!(ability.can_named("export_everything", "galaxy"));
}

#[test]
fn guest_ability_denies_everything() {
    let ability = build_ability(&Catalog::standard(), &[]);
    for action in Action::iter() {
        for subject in Subject::iter() {
            assert!(!ability.can(action, subject));
        }
    }
}

#[test]
fn manager_user_scenario_expands_to_deduplicated_union() {
    let catalog = Catalog::builder()
        .inherits(Role::Manager, [Role::User])
        .grant(
            Role::Manager,
            Subject::Course,
            [Action::ViewCourse, Action::EditCourse],
        )
        .grant(Role::User, Subject::Course, [Action::ViewCourse])
        .build();
    let expected: PermissionSet = [
        (Subject::Course, Action::ViewCourse),
        (Subject::Course, Action::EditCourse),
    ]
    .into_iter()
    .collect();
    assert_eq!(catalog.expand_role(Role::Manager), expected);
}

#[test]
fn cyclic_inheritance_terminates() {
    let catalog = Catalog::builder()
        .inherits(Role::Auditor, [Role::Partner])
        .inherits(Role::Partner, [Role::Auditor])
        .grant(Role::Auditor, Subject::Report, [Action::ViewReports])
        .grant(Role::Partner, Subject::Partner, [Action::ManagePartners])
        .build();
    assert!(catalog.validate().is_err());
    let ability = build_ability(&catalog, &[Role::Partner]);
    assert!(ability.can(Action::ViewReports, Subject::Report));
    assert!(ability.can(Action::ManagePartners, Subject::Partner));
    assert!(!ability.can(Action::EditRole, Subject::Role));
}

#[test]
fn any_and_all_role_checks_for_plain_user() {
    let access = session_with(&["USER"]);
    assert!(access.has_any_role(&[Role::Admin, Role::User]));
    assert!(!access.has_all_roles(&[Role::Admin, Role::User]));
}

#[test]
fn permission_guard_renders_fallback_for_denied_edit_role() {
    let access = session_with(&["USER"]);
    assert!(!access.has_permission_named("edit_role", "role"));
    let gate = RequirePermission::new(Action::EditRole, Subject::Role);
    assert_eq!(gate.render(&access, || "<X/>", Some("<Y/>")), Some("<Y/>"));
}

#[test]
fn role_guard_defaults_to_nothing() {
    let access = session_with(&["PARTNER"]);
    let rendered: Option<&str> = RequireRole::any([Role::Admin, Role::Manager]).render(
        &access,
        || "<Secret/>",
        None,
    );
    assert!(rendered.is_none());
    assert_eq!(
        RequireRole::one(Role::Partner).render(&access, || "<Partner/>", None),
        Some("<Partner/>")
    );
}

#[test]
fn dashboard_navigation_by_role() {
    let admin = session_with(&["ADMIN"]);
    let auditor = session_with(&["AUDITOR"]);
    let logged_out = AccessControl::in_memory();

    assert!(visible_items(&admin).iter().any(|item| item.href == "/roles"));
    assert!(!visible_items(&auditor).iter().any(|item| item.href == "/roles"));
    assert!(visible_items(&logged_out).is_empty());

    assert_eq!(route_decision(&admin, "/roles"), RouteDecision::Allowed);
    assert_eq!(route_decision(&auditor, "/roles"), RouteDecision::Forbidden);
    assert_eq!(route_decision(&auditor, "//roles/edit"), RouteDecision::Forbidden);
    assert_eq!(route_decision(&auditor, "/analytics"), RouteDecision::Allowed);
    assert_eq!(
        route_decision(&logged_out, "/analytics"),
        RouteDecision::RedirectToLogin
    );
    assert_eq!(route_decision(&logged_out, "/login"), RouteDecision::Public);
}

#[test]
fn scoped_components_follow_role_changes() {
    let access = Arc::new(session_with(&["USER"]));
    let upload = with_permission(
        |name: &str| format!("<Upload {name}/>"),
        Action::UploadContent,
        Subject::Content,
    );

    AccessScope::with(access.clone(), || {
        assert_eq!(upload.render_in_scope("intro.mp4", None), None);
    });
    access.set_roles([Role::Manager]).unwrap();
    AccessScope::with(access, || {
        assert_eq!(
            upload.render_in_scope("intro.mp4", None),
            Some("<Upload intro.mp4/>".to_owned())
        );
    });
}

#[test]
fn checks_are_counted() {
    let registry = Arc::new(prometheus::Registry::new());
    let metrics = AccessMetrics::new(registry.clone()).unwrap();
    let access = AccessControl::open_with_metrics(
        Catalog::standard(),
        Arc::new(MemorySessionStore::new()),
        SessionOptions::default(),
        metrics.clone(),
    );
    access
        .login(LoginRequest::new("u-7", "Lee", "lee@example.com"))
        .unwrap();
    assert!(access.has_permission(Action::EnrollCourse, Subject::Course));
    assert!(!access.has_permission(Action::DeleteCourse, Subject::Course));
    assert!(!access.has_role(Role::Manager));

    assert_eq!(metrics.checks(CheckKind::Permission, true), 1);
    assert_eq!(metrics.checks(CheckKind::Permission, false), 1);
    assert_eq!(metrics.checks(CheckKind::Role, false), 1);
    assert_eq!(registry.gather().len(), 2);
}
