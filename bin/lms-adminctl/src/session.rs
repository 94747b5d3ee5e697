//! ---
//! lms_section: "05-external-interfaces"
//! lms_subsection: "binary"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Control CLI for administrators inspecting LMS access control."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Subcommand};
use lms_access::{
    visible_items, AccessControl, AccessMetrics, Catalog, FileSessionStore, LoginRequest,
    SessionOptions, UserId,
};
use lms_common::AppConfig;
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::json;

use crate::Output;

/// Dispatch entry point for session subcommands.
pub fn run(command: SessionCommand, config: &AppConfig, output: Output) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let access = open(config, &registry)?;
    match command {
        SessionCommand::Show(cmd) => cmd.execute(&access, &registry, output),
        SessionCommand::Login(cmd) => cmd.execute(&access, output),
        SessionCommand::Logout => {
            access.logout()?;
            output.emit(&json!({ "authenticated": false }), || {
                println!("session cleared")
            })
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Show the persisted user, recovery outcome and visible navigation.
    Show(ShowCommand),
    /// Persist a user as if the login backend had returned it.
    Login(LoginCommand),
    /// Clear the persisted session.
    Logout,
}

fn open(config: &AppConfig, registry: &Arc<Registry>) -> Result<AccessControl> {
    let options = SessionOptions::from_config(&config.session)
        .context("invalid [session] configuration")?;
    let store = Arc::new(FileSessionStore::new(config.session.store_dir.clone()));
    let catalog = Catalog::standard();
    let access = if config.metrics.enabled {
        let metrics = AccessMetrics::new(registry.clone())?;
        AccessControl::open_with_metrics(catalog, store, options, metrics)
    } else {
        AccessControl::open(catalog, store, options)
    };
    Ok(access)
}

#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Print the Prometheus exposition of the counters recorded by this run.
    #[arg(long = "metrics", action = ArgAction::SetTrue)]
    metrics: bool,
}

impl ShowCommand {
    fn execute(self, access: &AccessControl, registry: &Registry, output: Output) -> Result<()> {
        let user = access.current_user();
        let navigation: Vec<&str> = visible_items(access).iter().map(|item| item.href).collect();
        let value = json!({
            "recovery": access.recovery().to_string(),
            "authenticated": user.is_some(),
            "user": user.as_deref(),
            "navigation": navigation,
        });

        output.emit(&value, || {
            println!("recovery: {}", access.recovery());
            match &user {
                Some(user) => {
                    println!("user:     {} <{}> id={}", user.name, user.email, user.id);
                    println!("roles:    {}", user.role_names());
                    println!("nav:      {}", navigation.join(" "));
                }
                None => println!("user:     (none)"),
            }
        })?;

        if self.metrics {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
            print!("{}", String::from_utf8(buffer)?);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LoginCommand {
    /// User identifier.
    #[arg(long, value_name = "ID")]
    id: String,

    /// Display name.
    #[arg(long, default_value = "")]
    name: String,

    /// Contact address.
    #[arg(long, default_value = "")]
    email: String,

    /// Role name; repeat for several. Defaults to USER.
    #[arg(long = "role", value_name = "ROLE")]
    roles: Vec<String>,
}

impl LoginCommand {
    fn execute(self, access: &AccessControl, output: Output) -> Result<()> {
        let id: UserId = match self.id.parse::<u64>() {
            Ok(numeric) => numeric.into(),
            Err(_) => self.id.clone().into(),
        };
        let request = LoginRequest {
            id,
            name: self.name,
            email: self.email,
            roles: Some(self.roles),
        };
        let user = access.login(request)?;
        output.emit(&json!({ "authenticated": true, "user": user.as_ref() }), || {
            println!("logged in {} as {}", user.id, user.role_names())
        })
    }
}
