//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
//! The access-control facade: current user, its ability, and the checks UI code calls.
use std::sync::Arc;

use lms_common::SessionConfig;
use lms_logging::{lms_warn, log_access_event, AccessOutcome, LogContext};
use parking_lot::RwLock;
use strum::Display;
use tracing::debug;

use crate::ability::{Ability, AbilityResolver};
use crate::catalog::{Action, Catalog, Role, Subject};
use crate::error::{AccessError, Result};
use crate::identity::{LoginRequest, User};
use crate::metrics::{AccessMetrics, CheckKind, SessionEvent};
use crate::store::{restore_session, MemorySessionStore, SessionRecovery, SessionStore};

/// Store key and repair policy for the persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Key the user record is stored under.
    pub user_key: String,
    /// Roles substituted when a stored record has no usable role set.
    pub fallback_roles: Vec<Role>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            user_key: "user".to_owned(),
            fallback_roles: vec![Role::User],
        }
    }
}

impl SessionOptions {
    /// Resolve the `[session]` configuration section.
    ///
    /// Unknown role names are rejected, and so is `ADMIN`: a repaired record
    /// must never come back with the admin bypass.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        if config.user_key.trim().is_empty() {
            return Err(AccessError::InvalidStoreKey(config.user_key.clone()));
        }
        let fallback_roles = config
            .fallback_roles
            .iter()
            .map(|name| Role::parse(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if fallback_roles.is_empty() {
            return Err(AccessError::EmptyRoleSet);
        }
        if fallback_roles.contains(&Role::Admin) {
            return Err(AccessError::PrivilegedFallback(Role::Admin));
        }
        Ok(Self {
            user_key: config.user_key.trim().to_owned(),
            fallback_roles,
        })
    }
}

/// How the persisted session looked when the facade was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryKind {
    /// No record was stored.
    Empty,
    /// A valid record was restored.
    Restored,
    /// The record's roles were replaced with the fallback set.
    Repaired,
    /// The record was dropped.
    Discarded,
}

/// A user together with the ability built from its roles. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: Arc<User>,
    ability: Ability,
}

impl Session {
    /// Build the session for `user`, refreshing its permission cache.
    pub fn new(mut user: User, catalog: &Catalog) -> Self {
        user.refresh_permissions(catalog);
        let ability = AbilityResolver::new(catalog).build(&user.roles);
        Self {
            user: Arc::new(user),
            ability,
        }
    }

    /// The logged-in user.
    pub fn user(&self) -> &Arc<User> {
        &self.user
    }

    /// Ability derived from the user's roles.
    pub fn ability(&self) -> &Ability {
        &self.ability
    }
}

/// Session-scoped access control over one catalog and one session store.
///
/// The current session is replaced as a whole on login, logout and role
/// change; readers see either the old or the new session, never a mix.
pub struct AccessControl {
    catalog: Arc<Catalog>,
    store: Arc<dyn SessionStore>,
    options: SessionOptions,
    current: RwLock<Option<Arc<Session>>>,
    metrics: Option<AccessMetrics>,
    recovery: RecoveryKind,
}

impl AccessControl {
    /// Open the facade, restoring any persisted session once.
    pub fn open(catalog: Arc<Catalog>, store: Arc<dyn SessionStore>, options: SessionOptions) -> Self {
        Self::build(catalog, store, options, None)
    }

    /// Like [`AccessControl::open`], recording checks and session events.
    pub fn open_with_metrics(
        catalog: Arc<Catalog>,
        store: Arc<dyn SessionStore>,
        options: SessionOptions,
        metrics: AccessMetrics,
    ) -> Self {
        Self::build(catalog, store, options, Some(metrics))
    }

    /// Standard catalog over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::open(
            Catalog::standard(),
            Arc::new(MemorySessionStore::new()),
            SessionOptions::default(),
        )
    }

    fn build(
        catalog: Arc<Catalog>,
        store: Arc<dyn SessionStore>,
        options: SessionOptions,
        metrics: Option<AccessMetrics>,
    ) -> Self {
        let recovered = restore_session(
            store.as_ref(),
            &options.user_key,
            &catalog,
            &options.fallback_roles,
        );
        let recovery = recovered.kind();
        if matches!(
            recovered,
            SessionRecovery::Repaired { .. } | SessionRecovery::Discarded { .. }
        ) {
            if let Some(metrics) = &metrics {
                metrics.record_session_event(SessionEvent::Recovered);
            }
        }
        let current = recovered
            .into_user()
            .map(|user| Arc::new(Session::new(user, &catalog)));
        debug!(
            key = %options.user_key,
            recovery = %recovery,
            authenticated = current.is_some(),
            "access control opened"
        );
        Self {
            catalog,
            store,
            options,
            current: RwLock::new(current),
            metrics,
            recovery,
        }
    }

    /// Catalog checks are resolved against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Store key and repair policy.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Attached metrics, if any.
    pub fn metrics(&self) -> Option<&AccessMetrics> {
        self.metrics.as_ref()
    }

    /// What happened to the stored session when the facade opened.
    pub fn recovery(&self) -> RecoveryKind {
        self.recovery
    }

    /// Log in with a backend-supplied user record.
    ///
    /// The record is persisted before the in-memory session is replaced, so a
    /// store failure leaves the previous session in place.
    pub fn login(&self, request: LoginRequest) -> Result<Arc<User>> {
        let user = match User::from_login(request) {
            Ok(user) => user,
            Err(err) => {
                log_access_event(None, "session.login", &err.to_string(), AccessOutcome::Denied);
                return Err(err);
            }
        };
        let mut current = self.current.write();
        let session = self.persist(user)?;
        let user = session.user().clone();
        *current = Some(session);
        drop(current);

        self.record_event(SessionEvent::Login);
        let id = user.id.to_string();
        let roles = user.role_names();
        log_access_event(
            Some(&self.context().with_user(&id).with_roles(&roles)),
            "session.login",
            "user logged in",
            AccessOutcome::Granted,
        );
        Ok(user)
    }

    /// Clear the session.
    ///
    /// The stored record is removed before memory is cleared. If the store
    /// refuses, the session stays in place so a restart cannot resurrect a
    /// user the caller believes is logged out.
    pub fn logout(&self) -> Result<()> {
        let mut current = self.current.write();
        if let Err(err) = self.store.remove(&self.options.user_key) {
            lms_warn!(
                context = self.context(),
                "logout failed, stored session under key {} kept: {err}",
                self.options.user_key
            );
            return Err(err);
        }
        let previous = current.take();
        drop(current);
        self.record_event(SessionEvent::Logout);
        let id = previous
            .as_ref()
            .map(|session| session.user().id.to_string())
            .unwrap_or_default();
        log_access_event(
            Some(&self.context().with_user(&id)),
            "session.logout",
            "session cleared",
            AccessOutcome::Granted,
        );
        Ok(())
    }

    /// Replace the current user's roles, rebuilding and persisting the session.
    pub fn set_roles(&self, roles: impl IntoIterator<Item = Role>) -> Result<Arc<User>> {
        let mut current = self.current.write();
        let existing = current.as_ref().ok_or(AccessError::NotAuthenticated)?;
        let updated = existing.user().with_roles(roles)?;
        let session = self.persist(updated)?;
        let user = session.user().clone();
        *current = Some(session);
        drop(current);

        self.record_event(SessionEvent::RoleChange);
        let id = user.id.to_string();
        let roles = user.role_names();
        log_access_event(
            Some(&self.context().with_user(&id).with_roles(&roles)),
            "session.role_change",
            "roles replaced",
            AccessOutcome::Granted,
        );
        Ok(user)
    }

    /// Persist profile edits. Roles and ability are unchanged.
    pub fn update_profile(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Arc<User>> {
        let mut current = self.current.write();
        let existing = current.as_ref().ok_or(AccessError::NotAuthenticated)?;
        let mut updated = User::clone(existing.user());
        updated.name = name.into();
        updated.email = email.into();
        let session = self.persist(updated)?;
        let user = session.user().clone();
        *current = Some(session);
        Ok(user)
    }

    fn persist(&self, user: User) -> Result<Arc<Session>> {
        let session = Session::new(user, &self.catalog);
        let encoded = serde_json::to_string(session.user().as_ref())?;
        self.store.set(&self.options.user_key, &encoded)?;
        Ok(Arc::new(session))
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// Current session snapshot.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.current.read().clone()
    }

    /// Current user.
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.session().map(|session| session.user().clone())
    }

    /// Current ability; [`Ability::Guest`] when logged out.
    pub fn ability(&self) -> Ability {
        self.session()
            .map(|session| session.ability().clone())
            .unwrap_or_default()
    }

    /// Direct membership of `role`. Inheritance is not consulted.
    pub fn has_role(&self, role: Role) -> bool {
        let granted = self.with_user(|user| user.has_role(role));
        self.record_check(CheckKind::Role, granted, || format!("role {role}"));
        granted
    }

    /// Whether the user holds at least one of `roles`. False for an empty list.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        let granted = self.with_user(|user| roles.iter().any(|role| user.has_role(*role)));
        self.record_check(CheckKind::Role, granted, || format!("any of {roles:?}"));
        granted
    }

    /// Whether the user holds every one of `roles`. True for an empty list when logged in.
    pub fn has_all_roles(&self, roles: &[Role]) -> bool {
        let granted = self.with_user(|user| roles.iter().all(|role| user.has_role(*role)));
        self.record_check(CheckKind::Role, granted, || format!("all of {roles:?}"));
        granted
    }

    /// Delegates to the current ability. Inheritance and the admin bypass apply.
    pub fn has_permission(&self, action: Action, subject: Subject) -> bool {
        let granted = self
            .session()
            .map(|session| session.ability().can(action, subject))
            .unwrap_or(false);
        self.record_check(CheckKind::Permission, granted, || {
            format!("{action} on {subject}")
        });
        granted
    }

    /// [`AccessControl::has_permission`] for untyped names. Unknown names are denied.
    pub fn has_permission_named(&self, action: &str, subject: &str) -> bool {
        let granted = self
            .session()
            .map(|session| session.ability().can_named(action, subject))
            .unwrap_or(false);
        self.record_check(CheckKind::Permission, granted, || {
            format!("{action} on {subject}")
        });
        granted
    }

    fn with_user(&self, check: impl FnOnce(&User) -> bool) -> bool {
        self.current
            .read()
            .as_ref()
            .map(|session| check(session.user()))
            .unwrap_or(false)
    }

    fn record_check(&self, kind: CheckKind, granted: bool, describe: impl FnOnce() -> String) {
        if let Some(metrics) = &self.metrics {
            metrics.record_check(kind, granted);
        }
        if !granted {
            let kind: &'static str = kind.into();
            debug!(check = kind, target_check = %describe(), "access denied");
        }
    }

    fn record_event(&self, event: SessionEvent) {
        if let Some(metrics) = &self.metrics {
            metrics.record_session_event(event);
        }
    }

    fn context(&self) -> LogContext<'_> {
        LogContext::new().with_session(&self.options.user_key)
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("user_key", &self.options.user_key)
            .field("authenticated", &self.is_authenticated())
            .field("recovery", &self.recovery)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    fn login_as(access: &AccessControl, roles: &[&str]) -> Arc<User> {
        access
            .login(LoginRequest::new(1u64, "Jane", "jane@example.com").with_roles(roles.iter().copied()))
            .unwrap()
    }

    #[test]
    fn checks_fail_closed_without_a_user() {
        let access = AccessControl::in_memory();
        assert!(!access.is_authenticated());
        assert!(access.current_user().is_none());
        assert_eq!(access.ability(), Ability::Guest);
        assert!(!access.has_role(Role::User));
        assert!(!access.has_any_role(&[Role::Admin, Role::User]));
        assert!(!access.has_all_roles(&[]));
        assert!(!access.has_permission(Action::ViewCourse, Subject::Course));
        assert!(!access.has_permission_named("view_course", "course"));
    }

    #[test]
    fn role_checks_use_direct_membership() {
        let access = AccessControl::in_memory();
        login_as(&access, &["USER"]);
        assert!(access.has_any_role(&[Role::Admin, Role::User]));
        assert!(!access.has_all_roles(&[Role::Admin, Role::User]));
        assert!(access.has_all_roles(&[]));
        assert!(!access.has_any_role(&[]));

        login_as(&access, &["MANAGER"]);
        assert!(!access.has_role(Role::User));
        assert!(access.has_permission(Action::ViewContent, Subject::Content));
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let store = Arc::new(MemorySessionStore::new());
        let access = AccessControl::open(
            Catalog::standard(),
            store.clone(),
            SessionOptions::default(),
        );
        let user = login_as(&access, &["AUDITOR"]);
        assert!(user.permissions.is_some());
        let stored = store.get("user").unwrap().unwrap();
        assert!(stored.contains("AUDITOR"));

        access.logout().unwrap();
        assert!(!access.is_authenticated());
        assert!(store.get("user").unwrap().is_none());
        access.logout().unwrap();
    }

    struct StuckStore(MemorySessionStore);

    impl SessionStore for StuckStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn failed_store_removal_keeps_session() {
        let store = Arc::new(StuckStore(MemorySessionStore::new()));
        let access = AccessControl::open(Catalog::standard(), store.clone(), SessionOptions::default());
        login_as(&access, &["MANAGER"]);

        assert!(matches!(access.logout(), Err(AccessError::Store(_))));
        assert!(access.has_role(Role::Manager));
        assert!(store.get("user").unwrap().is_some());

        let reopened = AccessControl::open(Catalog::standard(), store, SessionOptions::default());
        assert_eq!(reopened.current_user(), access.current_user());
    }

    #[test]
    fn invalid_login_keeps_previous_session() {
        let access = AccessControl::in_memory();
        login_as(&access, &["PARTNER"]);
        let err = access
            .login(LoginRequest::new(2u64, "Eve", "eve@example.com").with_roles(["SUPERUSER"]))
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidLogin(_)));
        assert!(access.has_role(Role::Partner));
    }

    #[test]
    fn set_roles_rebuilds_ability() {
        let access = AccessControl::in_memory();
        login_as(&access, &["USER"]);
        assert!(!access.has_permission(Action::EditRole, Subject::Role));
        access.set_roles([Role::Admin]).unwrap();
        assert!(access.ability().is_wildcard());
        assert!(access.has_permission(Action::EditRole, Subject::Role));
        assert!(matches!(
            access.set_roles([]),
            Err(AccessError::EmptyRoleSet)
        ));
        assert!(access.has_role(Role::Admin));
    }

    #[test]
    fn mutations_require_a_user() {
        let access = AccessControl::in_memory();
        assert!(matches!(
            access.set_roles([Role::User]),
            Err(AccessError::NotAuthenticated)
        ));
        assert!(matches!(
            access.update_profile("x", "y"),
            Err(AccessError::NotAuthenticated)
        ));
    }

    #[test]
    fn profile_updates_are_persisted() {
        let store = Arc::new(MemorySessionStore::new());
        let access = AccessControl::open(Catalog::standard(), store.clone(), SessionOptions::default());
        login_as(&access, &["USER"]);
        let user = access.update_profile("Jane Doe", "jane.doe@example.com").unwrap();
        assert_eq!(user.name, "Jane Doe");
        assert!(user.has_role(Role::User));

        let reopened = AccessControl::open(Catalog::standard(), store, SessionOptions::default());
        assert_eq!(reopened.recovery(), RecoveryKind::Restored);
        assert_eq!(reopened.current_user().unwrap().email, "jane.doe@example.com");
    }

    #[test]
    fn open_repairs_corrupt_record() {
        let store = Arc::new(MemorySessionStore::new());
        store.set("user", r#"{"id":1,"roles":[]}"#).unwrap();
        let registry = Arc::new(Registry::new());
        let metrics = AccessMetrics::new(registry).unwrap();
        let access = AccessControl::open_with_metrics(
            Catalog::standard(),
            store,
            SessionOptions::default(),
            metrics.clone(),
        );
        assert_eq!(access.recovery(), RecoveryKind::Repaired);
        assert!(access.has_role(Role::User));
        assert!(!access.has_role(Role::Admin));
        assert_eq!(metrics.session_events(SessionEvent::Recovered), 1);
        assert_eq!(metrics.checks(CheckKind::Role, false), 1);
    }

    #[test]
    fn options_from_config() {
        let config = SessionConfig {
            fallback_roles: vec!["PARTNER".into(), "USER".into()],
            ..SessionConfig::default()
        };
        let options = SessionOptions::from_config(&config).unwrap();
        assert_eq!(options.fallback_roles, vec![Role::Partner, Role::User]);
        assert_eq!(options.user_key, "user");

        let bad = SessionConfig {
            fallback_roles: vec!["GOD".into()],
            ..SessionConfig::default()
        };
        assert!(matches!(
            SessionOptions::from_config(&bad),
            Err(AccessError::Catalog(_))
        ));
    }

    #[test]
    fn admin_fallback_is_rejected() {
        let config = SessionConfig {
            fallback_roles: vec!["USER".into(), "ADMIN".into()],
            ..SessionConfig::default()
        };
        assert!(matches!(
            SessionOptions::from_config(&config),
            Err(AccessError::PrivilegedFallback(Role::Admin))
        ));

        let only_admin = SessionConfig {
            fallback_roles: vec!["ADMIN".into()],
            ..SessionConfig::default()
        };
        assert!(SessionOptions::from_config(&only_admin).is_err());
    }

    #[test]
    fn hand_built_admin_fallback_still_repairs_to_user() {
        let store = Arc::new(MemorySessionStore::new());
        store.set("user", r#"{"id":1,"roles":[]}"#).unwrap();
        let options = SessionOptions {
            fallback_roles: vec![Role::Admin],
            ..SessionOptions::default()
        };
        let access = AccessControl::open(Catalog::standard(), store, options);
        assert_eq!(access.recovery(), RecoveryKind::Repaired);
        assert!(!access.has_role(Role::Admin));
        assert!(access.has_role(Role::User));
        assert!(!access.has_permission(Action::DeleteRole, Subject::Role));
    }
}
