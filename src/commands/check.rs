//! Verify that an account can connect and show who it is

use std::path::Path;

use grammers_client::types::User;

use super::{load_config_or_default, pick_account};
use crate::config::{AccountConfig, AppConfig};
use crate::error::{Error, Result};
use crate::input::Prompt;
use crate::session::initialize_account;

/// One line per field, as printed by `check` and `login`
pub fn describe_user(user: &User) -> String {
    format!(
        "  ID: {}\n  Username: @{}\n  Name: {}",
        user.raw.id(),
        user.username().unwrap_or("-"),
        user.full_name()
    )
}

/// Readable explanation for common connection failures
pub fn friendly_error(err: &Error) -> String {
    let text = err.to_string();
    if matches!(err, Error::InvalidApiCredentials) || text.contains("API_ID_INVALID") {
        "Invalid api_id/api_hash. Get valid ones at https://my.telegram.org/apps".to_string()
    } else if text.contains("AUTH_KEY_UNREGISTERED") || matches!(err, Error::Unauthorized(_)) {
        "The session is no longer valid. Delete the session file and log in again.".to_string()
    } else if text.contains("FLOOD_WAIT") {
        "Too many attempts. Telegram asks to wait before retrying.".to_string()
    } else if text.contains("PHONE_NUMBER_INVALID") {
        "Invalid phone number. Use the international format, e.g. +79001234567.".to_string()
    } else if text.contains("PHONE_CODE_INVALID") || text.contains("invalid login code") {
        "Wrong login code.".to_string()
    } else if text.to_lowercase().contains("connection") || text.to_lowercase().contains("network") {
        format!("Network problem: {}. Check your internet connection.", text)
    } else {
        text
    }
}

async fn check_account(
    account: &AccountConfig,
    config: &AppConfig,
    prompt: &mut dyn Prompt,
) -> Result<User> {
    let creds = config.api_credentials(prompt)?;
    let client = initialize_account(account, &creds, prompt).await?;
    let me = client.get_me().await;
    client.disconnect();
    Ok(me?)
}

pub async fn run(
    config_path: Option<&Path>,
    account_name: Option<&str>,
    prompt: &mut dyn Prompt,
) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let account = pick_account(&config, account_name)?;

    println!("Checking account '{}'...", account.name);
    match check_account(account, &config, prompt).await {
        Ok(me) => {
            println!("✓ Account is authorized:");
            println!("{}", describe_user(&me));
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", friendly_error(&e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_telegram_errors() {
        assert!(friendly_error(&Error::InvalidApiCredentials).contains("my.telegram.org"));
        assert!(friendly_error(&Error::TelegramError(
            "rpc error 401: AUTH_KEY_UNREGISTERED".into()
        ))
        .contains("log in again"));
        assert!(
            friendly_error(&Error::TelegramError("FLOOD_WAIT_420".into())).contains("wait")
        );
        assert!(friendly_error(&Error::TelegramError(
            "Failed to request code: PHONE_NUMBER_INVALID".into()
        ))
        .contains("international format"));
        assert!(friendly_error(&Error::TelegramError("connection reset".into()))
            .starts_with("Network problem"));
    }

    #[test]
    fn unknown_errors_pass_through() {
        let err = Error::ChatNotFound("42".into());
        assert_eq!(friendly_error(&err), err.to_string());
    }
}
