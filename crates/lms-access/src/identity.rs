//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Role};
use crate::error::{AccessError, Result};
use crate::expander::RoleExpander;
use crate::permission::PermissionSet;

/// Identifier for a user account. Backends hand out numeric or string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric identifier.
    Numeric(u64),
    /// Opaque string identifier.
    Text(String),
}

impl UserId {
    fn is_blank(&self) -> bool {
        matches!(self, UserId::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_owned())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

/// The logged-in user as persisted in the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact address.
    #[serde(default)]
    pub email: String,
    /// Assigned roles, non-empty, in assignment order without duplicates.
    pub roles: Vec<Role>,
    /// Derived cache of the expanded catalog grants. Never consulted for checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
}

impl User {
    /// Construct a user. Duplicate roles are dropped; an empty set is rejected.
    pub fn new(
        id: impl Into<UserId>,
        name: impl Into<String>,
        email: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<Self> {
        let roles = dedup_roles(roles);
        if roles.is_empty() {
            return Err(AccessError::EmptyRoleSet);
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            roles,
            permissions: None,
        })
    }

    /// Build a user from a login payload. Missing or empty roles default to `USER`.
    ///
    /// Unknown role names are not defaulted: the payload is rejected with
    /// [`AccessError::InvalidLogin`] so a misspelt role surfaces at login instead
    /// of silently becoming `USER`. Only [`restore_session`](crate::restore_session)
    /// substitutes roles, and only for records already persisted.
    pub fn from_login(request: LoginRequest) -> Result<Self> {
        if request.id.is_blank() {
            return Err(AccessError::InvalidLogin("user id cannot be empty".into()));
        }
        let names = request.roles.unwrap_or_default();
        let roles = if names.is_empty() {
            vec![Role::User]
        } else {
            names
                .iter()
                .map(|name| Role::parse(name))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|err| AccessError::InvalidLogin(err.to_string()))?
        };
        Self::new(request.id, request.name, request.email, roles)
    }

    /// Copy of this user holding `roles` instead. The permission cache is cleared.
    pub fn with_roles(&self, roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        let roles = dedup_roles(roles);
        if roles.is_empty() {
            return Err(AccessError::EmptyRoleSet);
        }
        Ok(Self {
            roles,
            permissions: None,
            ..self.clone()
        })
    }

    /// Recompute the derived permission cache from the current roles.
    pub fn refresh_permissions(&mut self, catalog: &Catalog) {
        let expanded = RoleExpander::new(catalog).expand_roles(self.roles.iter().copied());
        self.permissions = Some(expanded);
    }

    /// Direct role membership; inheritance is not consulted.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Comma separated role names for logs.
    pub fn role_names(&self) -> String {
        self.roles
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub(crate) fn dedup_roles(roles: impl IntoIterator<Item = Role>) -> Vec<Role> {
    let mut unique = Vec::new();
    for role in roles {
        if !unique.contains(&role) {
            unique.push(role);
        }
    }
    unique
}

/// User-shaped record returned by the login backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Identifier issued by the backend.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact address.
    #[serde(default)]
    pub email: String,
    /// Role names; absent or empty means `USER`.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl LoginRequest {
    /// Login payload without roles.
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            roles: None,
        }
    }

    /// Attach role names.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_without_roles_defaults_to_user() {
        let user = User::from_login(LoginRequest::new(1u64, "Jane", "jane@example.com")).unwrap();
        assert_eq!(user.roles, vec![Role::User]);

        let user = User::from_login(
            LoginRequest::new(2u64, "John", "john@example.com").with_roles(Vec::<String>::new()),
        )
        .unwrap();
        assert_eq!(user.roles, vec![Role::User]);
    }

    #[test]
    fn login_rejects_unknown_roles() {
        let err = User::from_login(
            LoginRequest::new("u-9", "Mallory", "m@example.com").with_roles(["USER", "ROOT"]),
        )
        .unwrap_err();
        assert!(matches!(err, AccessError::InvalidLogin(message) if message.contains("ROOT")));
    }

    #[test]
    fn login_rejects_blank_id() {
        let err = User::from_login(LoginRequest::new(" ", "x", "x@example.com")).unwrap_err();
        assert!(matches!(err, AccessError::InvalidLogin(_)));
    }

    #[test]
    fn roles_are_deduplicated_in_order() {
        let user = User::new(3u64, "Jane", "", [Role::Manager, Role::Auditor, Role::Manager]).unwrap();
        assert_eq!(user.roles, vec![Role::Manager, Role::Auditor]);
        assert_eq!(user.role_names(), "MANAGER,AUDITOR");
    }

    #[test]
    fn role_change_clears_cached_permissions() {
        let catalog = Catalog::standard();
        let mut user = User::new(4u64, "Jane", "", [Role::User]).unwrap();
        user.refresh_permissions(&catalog);
        assert!(user.permissions.is_some());
        let promoted = user.with_roles([Role::Manager]).unwrap();
        assert!(promoted.permissions.is_none());
        assert!(promoted.has_role(Role::Manager));
        assert!(!promoted.has_role(Role::User));
        assert!(matches!(user.with_roles([]), Err(AccessError::EmptyRoleSet)));
    }

    #[test]
    fn user_ids_accept_numbers_and_strings() {
        let numeric: User =
            serde_json::from_str(r#"{"id": 1, "name": "Admin User", "roles": ["ADMIN"]}"#).unwrap();
        assert_eq!(numeric.id, UserId::Numeric(1));
        let text: User = serde_json::from_str(r#"{"id": "abc", "roles": ["USER"]}"#).unwrap();
        assert_eq!(text.id.to_string(), "abc");
        assert_eq!(text.email, "");
    }

    #[test]
    fn permission_cache_is_omitted_until_computed() {
        let user = User::new(5u64, "Jane", "jane@example.com", [Role::User]).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("permissions").is_none());
        assert_eq!(json["roles"], serde_json::json!(["USER"]));
    }
}
