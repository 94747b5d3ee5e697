//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
//! Thread-local session scope. Render code obtains the facade through
//! [`use_access`], which refuses to work outside an [`AccessScope`].
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::session::AccessControl;

thread_local! {
    static ACTIVE: RefCell<Vec<Arc<AccessControl>>> = const { RefCell::new(Vec::new()) };
}

/// Installs a facade for the current thread until dropped. Scopes nest.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct AccessScope {
    depth: usize,
    // Tied to the thread whose stack it pushed onto.
    _not_send: PhantomData<*const ()>,
}

impl AccessScope {
    /// Make `access` the facade returned by [`use_access`] on this thread.
    pub fn enter(access: Arc<AccessControl>) -> Self {
        let depth = ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(access);
            stack.len()
        });
        Self {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Run `body` inside a scope for `access`.
    pub fn with<T>(access: Arc<AccessControl>, body: impl FnOnce() -> T) -> T {
        let _scope = Self::enter(access);
        body()
    }
}

impl Drop for AccessScope {
    fn drop(&mut self) {
        ACTIVE.with(|stack| stack.borrow_mut().truncate(self.depth - 1));
    }
}

/// The innermost facade on this thread, if a scope is active.
pub fn try_use_access() -> Option<Arc<AccessControl>> {
    ACTIVE.with(|stack| stack.borrow().last().cloned())
}

/// The innermost facade on this thread.
///
/// # Panics
///
/// Panics when called outside an [`AccessScope`]. That is a wiring bug, not a
/// denied check.
pub fn use_access() -> Arc<AccessControl> {
    match try_use_access() {
        Some(access) => access,
        None => panic!("use_access called outside an AccessScope; enter one with AccessScope::enter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Role;
    use crate::identity::LoginRequest;

    #[test]
    fn no_scope_means_no_access() {
        assert!(try_use_access().is_none());
    }

    #[test]
    #[should_panic(expected = "outside an AccessScope")]
    fn use_access_outside_scope_panics() {
        let _ = use_access();
    }

    #[test]
    fn nested_scopes_restore_outer_facade() {
        let outer = Arc::new(AccessControl::in_memory());
        let inner = Arc::new(AccessControl::in_memory());
        inner
            .login(LoginRequest::new(1u64, "Ada", "ada@example.com").with_roles(["ADMIN"]))
            .unwrap();

        let _outer_scope = AccessScope::enter(outer.clone());
        assert!(!use_access().has_role(Role::Admin));
        AccessScope::with(inner.clone(), || {
            assert!(Arc::ptr_eq(&use_access(), &inner));
            assert!(use_access().has_role(Role::Admin));
        });
        assert!(Arc::ptr_eq(&use_access(), &outer));
    }

    #[test]
    fn scopes_are_per_thread() {
        let _scope = AccessScope::enter(Arc::new(AccessControl::in_memory()));
        let seen = std::thread::spawn(|| try_use_access().is_some()).join().unwrap();
        assert!(!seen);
        assert!(try_use_access().is_some());
    }
}
