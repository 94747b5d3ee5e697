//! ---
//! lms_section: "06-access-control"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Role catalog, permission resolution, and session-scoped access checks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lms_logging::{lms_error, lms_warn, LogContext};
use parking_lot::RwLock;
use serde_json::Value;

use crate::catalog::{Catalog, Role};
use crate::error::{AccessError, Result};
use crate::identity::{dedup_roles, User, UserId};
use crate::session::RecoveryKind;

/// Key/value persistence for the serialized user record.
pub trait SessionStore: Send + Sync {
    /// Raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, used by tests and by embedders without a disk.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One JSON document per key under a directory.
///
/// Writes go to a sibling temporary file that is renamed into place.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if !valid {
            return Err(AccessError::InvalidStoreKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let staging = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(value.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// What [`restore_session`] found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRecovery {
    /// Nothing was stored.
    Empty,
    /// A valid record was loaded.
    Restored(User),
    /// The record parsed but its roles were unusable and were replaced with the fallback set.
    Repaired {
        /// The repaired user, already written back.
        user: User,
        /// What was wrong with the stored roles.
        reason: String,
    },
    /// The record could not be used at all and was removed.
    Discarded {
        /// Why the record was rejected.
        reason: String,
    },
}

impl SessionRecovery {
    /// The recovered user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionRecovery::Restored(user) | SessionRecovery::Repaired { user, .. } => Some(user),
            SessionRecovery::Empty | SessionRecovery::Discarded { .. } => None,
        }
    }

    /// Consume into the recovered user, if any.
    pub fn into_user(self) -> Option<User> {
        match self {
            SessionRecovery::Restored(user) | SessionRecovery::Repaired { user, .. } => Some(user),
            SessionRecovery::Empty | SessionRecovery::Discarded { .. } => None,
        }
    }

    /// Outcome label without the payload.
    pub fn kind(&self) -> RecoveryKind {
        match self {
            SessionRecovery::Empty => RecoveryKind::Empty,
            SessionRecovery::Restored(_) => RecoveryKind::Restored,
            SessionRecovery::Repaired { .. } => RecoveryKind::Repaired,
            SessionRecovery::Discarded { .. } => RecoveryKind::Discarded,
        }
    }
}

enum Decoded {
    Valid(User),
    BadRoles { user: User, reason: String },
}

/// Load the persisted user stored under `key`.
///
/// Never fails: a damaged record is repaired with `fallback` roles or dropped,
/// and store errors leave the session unauthenticated. `ADMIN` is dropped
/// from `fallback`; when nothing else remains the record is repaired to `USER`.
pub fn restore_session(
    store: &dyn SessionStore,
    key: &str,
    catalog: &Catalog,
    fallback: &[Role],
) -> SessionRecovery {
    let ctx = LogContext::new().with_session(key);
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SessionRecovery::Empty,
        Err(err) => {
            lms_error!(context = ctx, "session store unreadable: {err}");
            return SessionRecovery::Discarded {
                reason: format!("store unreadable: {err}"),
            };
        }
    };

    match decode_record(&raw) {
        Ok(Decoded::Valid(mut user)) => {
            user.refresh_permissions(catalog);
            SessionRecovery::Restored(user)
        }
        Ok(Decoded::BadRoles { mut user, reason }) => {
            let mut fallback = dedup_roles(
                fallback.iter().copied().filter(|role| *role != Role::Admin),
            );
            if fallback.is_empty() {
                fallback.push(Role::User);
            }
            user.roles = fallback;
            user.refresh_permissions(catalog);
            let roles = user.role_names();
            lms_warn!(
                context = ctx.clone().with_roles(&roles),
                "stored session repaired: {reason}"
            );
            match serde_json::to_string(&user) {
                Ok(encoded) => {
                    if let Err(err) = store.set(key, &encoded) {
                        lms_error!(context = ctx, "repaired session not persisted: {err}");
                    }
                }
                Err(err) => lms_error!(context = ctx, "repaired session not encoded: {err}"),
            }
            SessionRecovery::Repaired { user, reason }
        }
        Err(reason) => {
            lms_warn!(context = ctx, "stored session discarded: {reason}");
            if let Err(err) = store.remove(key) {
                lms_error!(context = ctx, "discarded session not removed: {err}");
            }
            SessionRecovery::Discarded { reason }
        }
    }
}

fn decode_record(raw: &str) -> std::result::Result<Decoded, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| format!("unparsable record: {err}"))?;
    let Value::Object(fields) = value else {
        return Err("record is not an object".into());
    };

    let id = match fields.get("id") {
        None | Some(Value::Null) => return Err("record has no id".into()),
        Some(id) => serde_json::from_value::<UserId>(id.clone())
            .map_err(|_| format!("unsupported id {id}"))?,
    };
    if matches!(&id, UserId::Text(text) if text.trim().is_empty()) {
        return Err("record has a blank id".into());
    }

    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    let mut user = User {
        id,
        name: text("name"),
        email: text("email"),
        roles: Vec::new(),
        permissions: None,
    };

    match decode_roles(fields.get("roles")) {
        Ok(roles) => {
            user.roles = roles;
            Ok(Decoded::Valid(user))
        }
        Err(reason) => Ok(Decoded::BadRoles { user, reason }),
    }
}

fn decode_roles(value: Option<&Value>) -> std::result::Result<Vec<Role>, String> {
    let Some(value) = value else {
        return Err("roles missing".into());
    };
    let Value::Array(items) = value else {
        return Err(format!("roles is not an array: {value}"));
    };
    if items.is_empty() {
        return Err("roles is empty".into());
    }
    let mut roles = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| format!("role entry is not a string: {item}"))?;
        roles.push(Role::parse(name).map_err(|err| err.to_string())?);
    }
    Ok(dedup_roles(roles))
}
