//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod chat_ids;
pub mod check;
pub mod llm_check;
pub mod login;
pub mod run;
pub mod setup;

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Config for helper commands: a missing default config is not fatal.
pub(crate) fn load_config_or_default(explicit: Option<&Path>) -> Result<AppConfig> {
    match AppConfig::discover(explicit) {
        Err(Error::ConfigNotFound(_)) if explicit.is_none() => {
            dotenvy::dotenv().ok();
            Ok(AppConfig::default())
        }
        other => other,
    }
}

/// Account by name, or the first configured one.
pub(crate) fn pick_account<'a>(
    config: &'a AppConfig,
    name: Option<&str>,
) -> Result<&'a crate::config::AccountConfig> {
    match name {
        Some(name) => config
            .account(name)
            .ok_or_else(|| Error::Config(format!("account '{}' is not in the config", name))),
        None => config
            .accounts
            .first()
            .ok_or_else(|| Error::Config("no accounts configured".to_string())),
    }
}
