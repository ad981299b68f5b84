//! Interactive login that leaves a reusable session under `sessions/`

use std::path::{Path, PathBuf};

use super::check::describe_user;
use super::load_config_or_default;
use crate::config::default_session_path;
use crate::error::{Error, Result};
use crate::input::Prompt;
use crate::session::{connect_with_phone, export_session};

/// Log `account` in and return the session path.
///
/// The account does not have to be in the config; its phone is asked
/// for when unknown. A configured `session_file` receives a copy of the
/// new session.
pub async fn run(
    config_path: Option<&Path>,
    account: &str,
    prompt: &mut dyn Prompt,
) -> Result<PathBuf> {
    if account.trim().is_empty() {
        return Err(Error::InvalidArgument("account name is empty".to_string()));
    }

    let config = load_config_or_default(config_path)?;
    let configured = config.account(account);
    let creds = config.api_credentials(prompt)?;

    let phone = match configured.and_then(|a| a.phone.clone()).filter(|p| !p.trim().is_empty()) {
        Some(phone) => phone,
        None => prompt.read_line("Phone number (international format, e.g. +79001234567): ")?,
    };

    let session_path = default_session_path(account);
    let client = connect_with_phone(&session_path, &phone, &creds, prompt).await?;
    let me = client.get_me().await;
    client.disconnect();
    let me = me?;

    println!("✓ Logged in as:");
    println!("{}", describe_user(&me));
    println!("Session saved to {}", session_path.display());

    if let Some(target) = configured.and_then(|a| a.session_file.as_ref()) {
        if target != &session_path {
            export_session(&session_path, target)?;
            println!("Session copied to {}", target.display());
        }
    }

    Ok(session_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedPrompt;

    #[tokio::test]
    async fn empty_account_name_is_rejected_before_prompting() {
        let mut prompt = ScriptedPrompt::default();
        let err = run(None, "  ", &mut prompt).await.unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(prompt.asked.is_empty());
    }
}
