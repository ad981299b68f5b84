//! Interactive creation of config.yml

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{
    is_bot_api_chat_id, prompt_credentials, AccountConfig, AppConfig, LlmConfig,
    MediaForwardConfig, TelegramCredentials,
};
use crate::error::{Error, Result};
use crate::input::Prompt;

fn ask_yes_no(prompt: &mut dyn Prompt, label: &str) -> Result<bool> {
    let answer = prompt.read_line(&format!("{} [y/N]: ", label))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn parse_chat_id(input: &str) -> Result<i64> {
    input
        .parse::<i64>()
        .ok()
        .filter(|&id| is_bot_api_chat_id(id))
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is not a chat id", input)))
}

fn parse_id_list(input: &str) -> Result<Vec<i64>> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(parse_chat_id)
        .collect()
}

fn ask_account(prompt: &mut dyn Prompt, index: usize) -> Result<AccountConfig> {
    println!("\nAccount #{}", index);
    let mut name = prompt.read_line(&format!("Name [account{}]: ", index))?;
    if name.is_empty() {
        name = format!("account{}", index);
    }

    let mut account = AccountConfig {
        name,
        ..Default::default()
    };

    let session_file = prompt.read_line("Existing session file (empty to log in by phone): ")?;
    if session_file.is_empty() {
        let phone = prompt.read_line("Phone number (e.g. +79001234567): ")?;
        if phone.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "account '{}' needs a session file or a phone number",
                account.name
            )));
        }
        account.phone = Some(phone);
    } else {
        account.session_file = Some(PathBuf::from(session_file));
    }

    if ask_yes_no(prompt, "Enable LLM auto-replies?")? {
        let mut llm = LlmConfig {
            enabled: true,
            ..Default::default()
        };
        let url = prompt.read_line(&format!("LLM api_url [{}]: ", llm.api_url))?;
        if !url.is_empty() {
            llm.api_url = url;
        }
        llm.allowed_chat_ids =
            parse_id_list(&prompt.read_line("Allowed chat ids (empty for all chats): ")?)?;
        account.llm = llm;
    }

    if ask_yes_no(prompt, "Forward media to a channel?")? {
        let source_chat_ids = parse_id_list(&prompt.read_line("Source chat ids: ")?)?;
        let target = prompt.read_line("Target channel id (e.g. -1001234567890): ")?;
        let target_channel_id = parse_chat_id(&target)?;
        account.media_forward = MediaForwardConfig {
            enabled: true,
            source_chat_ids,
            target_channel_id: Some(target_channel_id),
            ..Default::default()
        };
    }

    Ok(account)
}

/// Ask for credentials and accounts.
pub fn build_config(prompt: &mut dyn Prompt) -> Result<AppConfig> {
    println!("Telegram API credentials (https://my.telegram.org/apps)");
    let creds = prompt_credentials(prompt)?;

    let count = prompt.read_line("How many accounts? [1]: ")?;
    let count = if count.is_empty() {
        1
    } else {
        count
            .parse::<usize>()
            .map_err(|_| Error::InvalidArgument(format!("'{}' is not a number", count)))?
    };
    if count == 0 {
        return Err(Error::InvalidArgument("at least one account is required".to_string()));
    }

    let mut names = HashSet::new();
    let mut accounts = Vec::with_capacity(count);
    for index in 1..=count {
        let account = ask_account(prompt, index)?;
        if !names.insert(account.name.clone()) {
            return Err(Error::Config(format!("duplicate account name '{}'", account.name)));
        }
        accounts.push(account);
    }

    Ok(AppConfig {
        telegram: TelegramCredentials {
            api_id: Some(creds.api_id.to_string()),
            api_hash: Some(creds.api_hash),
        },
        metrics_addr: None,
        accounts,
    })
}

/// Build a config interactively and write it to `output`.
pub fn run(output: &Path, prompt: &mut dyn Prompt) -> Result<PathBuf> {
    if output.exists() && !ask_yes_no(prompt, &format!("{} exists, overwrite?", output.display()))? {
        return Err(Error::InvalidArgument(format!(
            "{} already exists",
            output.display()
        )));
    }

    let config = build_config(prompt)?;
    config.save(output)?;

    info!(path = %output.display(), accounts = config.accounts.len(), "Config written");
    println!("\n✓ Config saved to {}", output.display());
    println!("Next: run `tg_accounts login <account>` for phone accounts, then `tg_accounts run`.");
    Ok(output.to_path_buf())
}
