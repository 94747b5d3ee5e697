//! ---
//! lms_section: "05-external-interfaces"
//! lms_subsection: "binary"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Control CLI for administrators inspecting LMS access control."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use clap::Args;
use indexmap::IndexMap;
use lms_access::{build_ability, Ability, Action, Catalog, Role, RoleExpander, Subject};
use serde_json::{json, Value};

use crate::Output;

/// `roles`: every catalog role with its direct parents and grant count.
pub fn roles(output: Output) -> Result<()> {
    let catalog = Catalog::standard();
    catalog.validate().context("shipped catalog failed validation")?;

    let mut rows: IndexMap<&'static str, Value> = IndexMap::new();
    for role in catalog.roles() {
        let parents: Vec<&str> = catalog.direct_parents(role).iter().map(Role::as_str).collect();
        let grants = catalog.direct_grants(role).map(|set| set.len()).unwrap_or(0);
        let effective = catalog.expand_role(role).len();
        rows.insert(
            role.as_str(),
            json!({ "inherits": parents, "direct_grants": grants, "effective_grants": effective }),
        );
    }

    output.emit(&json!(rows), || {
        println!("{:<10} {:<16} {:>7} {:>9}", "ROLE", "INHERITS", "DIRECT", "EFFECTIVE");
        for (role, row) in &rows {
            let inherits = row["inherits"]
                .as_array()
                .map(|parents| {
                    parents
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default();
            println!(
                "{:<10} {:<16} {:>7} {:>9}",
                role,
                if inherits.is_empty() { "-" } else { inherits.as_str() },
                row["direct_grants"].as_u64().unwrap_or(0),
                row["effective_grants"].as_u64().unwrap_or(0)
            );
        }
    })
}

#[derive(Debug, Args)]
pub struct ExpandCommand {
    /// Role to expand (e.g. MANAGER).
    #[arg(value_name = "ROLE")]
    pub role: String,
}

impl ExpandCommand {
    pub fn execute(self, output: Output) -> Result<()> {
        let role = Role::parse(&self.role)?;
        let catalog = Catalog::standard();
        let expander = RoleExpander::new(&catalog);
        let reachable: Vec<&str> = expander
            .reachable_roles(role)
            .into_iter()
            .map(|role| role.as_str())
            .collect();
        let expanded = expander.expand_role(role);

        let mut grants: IndexMap<&'static str, Vec<&'static str>> = IndexMap::new();
        for (subject, action) in expanded.iter() {
            grants.entry(subject.as_str()).or_default().push(action.as_str());
        }
        let value = json!({
            "role": role.as_str(),
            "reachable_roles": reachable,
            "permissions": grants,
        });

        output.emit(&value, || {
            println!("{} (via {})", role, reachable.join(", "));
            if role == Role::Admin {
                println!("  note: ADMIN bypasses the catalog and is granted every action");
            }
            for (subject, actions) in &grants {
                println!("  {:<8} {}", subject, actions.join(", "));
            }
        })
    }
}

#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Role held by the hypothetical user; repeat for several roles.
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Action name (e.g. edit_role).
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Subject name (e.g. role).
    #[arg(value_name = "SUBJECT")]
    pub subject: String,
}

impl CheckCommand {
    pub fn execute(self, output: Output) -> Result<()> {
        let roles = self
            .roles
            .iter()
            .map(|name| Role::parse(name))
            .collect::<Result<Vec<_>, _>>()?;
        // Names are validated up front so typos are reported instead of denied.
        let action = Action::parse(&self.action)?;
        let subject = Subject::parse(&self.subject)?;

        let ability = build_ability(&Catalog::standard(), &roles);
        let allowed = ability.can(action, subject);
        let basis = match &ability {
            Ability::Guest => "no roles",
            Ability::Wildcard => "admin bypass",
            Ability::Granted(_) => "catalog",
        };
        let value = json!({
            "roles": roles.iter().map(Role::as_str).collect::<Vec<_>>(),
            "action": action.as_str(),
            "subject": subject.as_str(),
            "allowed": allowed,
            "basis": basis,
        });

        output.emit(&value, || {
            let verdict = if allowed { "ALLOW" } else { "DENY" };
            println!("{verdict} {action} on {subject} ({basis})");
        })
    }
}
