//! List dialogs with their ids so they can be copied into the config

use std::path::Path;

use super::{load_config_or_default, pick_account};
use crate::chat::{list_dialogs, write_chat_ids, DialogInfo};
use crate::error::Result;
use crate::input::Prompt;
use crate::session::initialize_account;

pub const DEFAULT_LIMIT: usize = 50;

pub fn format_dialog(dialog: &DialogInfo) -> String {
    format!("{:<12} {:>16}  {}", dialog.kind.as_str(), dialog.id, dialog.name)
}

pub async fn run(
    config_path: Option<&Path>,
    account_name: Option<&str>,
    limit: usize,
    output: &Path,
    prompt: &mut dyn Prompt,
) -> Result<Vec<DialogInfo>> {
    let config = load_config_or_default(config_path)?;
    let account = pick_account(&config, account_name)?;
    let creds = config.api_credentials(prompt)?;

    let client = initialize_account(account, &creds, prompt).await?;
    let dialogs = list_dialogs(&client, limit).await;
    client.disconnect();
    let dialogs = dialogs?;

    println!("Dialogs of '{}':\n", account.name);
    for dialog in &dialogs {
        println!("{}", format_dialog(dialog));
    }

    write_chat_ids(output, &dialogs)?;
    println!("\n✓ {} dialogs written to {}", dialogs.len(), output.display());

    Ok(dialogs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatKind;

    #[test]
    fn dialog_line_shows_type_id_and_name() {
        let line = format_dialog(&DialogInfo {
            name: "Archive".into(),
            id: -1001234567890,
            kind: ChatKind::Channel,
        });

        assert!(line.starts_with("channel"));
        assert!(line.contains("-1001234567890"));
        assert!(line.ends_with("Archive"));
    }
}
