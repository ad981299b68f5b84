//! Tests for setup command

use tg_accounts::commands::setup;
use tg_accounts::{AppConfig, ScriptedPrompt};

#[test]
fn test_setup_writes_json_when_asked_for() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut prompt = ScriptedPrompt::new([
        "2040", "b18441a1ff607e10a989891a5462e627", "2", //
        "main", "", "+79001234567", "y", "", "", "n", //
        "media", "sessions/media.session", "n", "y", "-1001111111111", "-1002222222222",
    ]);

    setup::run(&path, &mut prompt).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with('{'));

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.accounts.len(), 2);
    assert!(config.account("main").unwrap().llm.enabled);
    assert!(config.account("main").unwrap().llm.allowed_chat_ids.is_empty());
    let media = &config.account("media").unwrap().media_forward;
    assert!(media.enabled);
    assert_eq!(media.source_chat_ids, vec![-1001111111111]);
}

#[test]
fn test_setup_rejects_bad_api_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    let mut prompt = ScriptedPrompt::new(["not-a-number"]);

    assert!(setup::run(&path, &mut prompt).is_err());
    assert!(!path.exists());
}
