//! Integration tests for tg_accounts library
//!
//! These tests verify the public API and module interactions.

mod commands;

use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use tg_accounts::{
    config::{default_session_path, AppConfig, PLACEHOLDER_API_HASH},
    error::{Error, Result},
    handlers::{AccountHandlers, IncomingMessage, MediaKind},
    is_bot_api_chat_id, normalize_chat_id,
    session::{initialize_account, lock_path, SessionLock},
    ApiCredentials, LlmClient, ScriptedPrompt,
};

const CONFIG_YAML: &str = r#"
telegram:
  api_id: 123456
  api_hash: 0123456789abcdef
accounts:
  - name: personal
    phone: "+79001234567"
    show_incoming: true
    llm:
      enabled: true
      allowed_chat_ids: [-1001234567890]
  - name: archive
    session_file: sessions/archive.session
    media_forward:
      enabled: true
      source_chat_ids: [111, -100222]
      target_channel_id: -1009999999999
"#;

/// Serializes tests that touch process environment variables
static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Sets an environment variable and restores the previous value on drop
struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let original = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, original }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.original {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

fn creds() -> ApiCredentials {
    ApiCredentials {
        api_id: 1,
        api_hash: "hash".to_string(),
    }
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_load_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(&path, CONFIG_YAML).unwrap();

    let config = AppConfig::load(&path).unwrap();

    assert_eq!(config.accounts.len(), 2);
    assert_eq!(config.telegram.api_id.as_deref(), Some("123456"));
    let personal = config.account("personal").unwrap();
    assert!(personal.show_incoming);
    assert!(personal.llm.enabled);
    assert_eq!(personal.llm.max_tokens, 500);
    assert!(!personal.media_forward.enabled);
    assert_eq!(
        personal.session_path(),
        default_session_path("personal")
    );
}

#[test]
fn test_config_load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
  "telegram": { "api_id": "42", "api_hash": "abc" },
  "accounts": [ { "name": "json_account", "phone": "+1000" } ]
}"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.accounts[0].name, "json_account");

    let mut prompt = ScriptedPrompt::default();
    let creds = config.api_credentials(&mut prompt).unwrap();
    assert_eq!(creds.api_id, 42);
    assert!(prompt.asked.is_empty());
}

#[test]
fn test_config_resolves_env_placeholders() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _phone = EnvGuard::set("TG_ACCOUNTS_IT_PHONE", "+15550001111");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(
        &path,
        "accounts:\n  - name: env\n    phone: ${TG_ACCOUNTS_IT_PHONE}\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.accounts[0].phone.as_deref(), Some("+15550001111"));
}

#[test]
fn test_env_guard_restores_previous_value() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    const KEY: &str = "TG_ACCOUNTS_IT_RESTORE";

    std::env::remove_var(KEY);
    {
        let _outer = EnvGuard::set(KEY, "outer");
        {
            let _inner = EnvGuard::set(KEY, "inner");
            assert_eq!(std::env::var(KEY).as_deref(), Ok("inner"));
        }
        assert_eq!(std::env::var(KEY).as_deref(), Ok("outer"));
    }
    assert!(std::env::var(KEY).is_err());
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));
}

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::parse(CONFIG_YAML).unwrap();

    for name in ["saved.yml", "saved.json"] {
        let path = dir.path().join(name);
        config.save(&path).unwrap();
        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.accounts.len(), 2);
        assert_eq!(
            reloaded.account("archive").unwrap().media_forward.target_channel_id,
            Some(-1009999999999)
        );
    }
}

#[test]
fn test_placeholder_hash_is_not_a_credential() {
    assert_eq!(PLACEHOLDER_API_HASH, "your_api_hash_here");
}

#[test]
fn test_chat_id_normalization() {
    assert_eq!(normalize_chat_id(-1001234567890), 1234567890);
    assert_eq!(normalize_chat_id(-4567), 4567);
    assert_eq!(normalize_chat_id(777), 777);
    assert_eq!(normalize_chat_id(i64::MIN), i64::MAX - 1_000_000_000_000);
}

#[test]
fn test_config_rejects_ids_outside_bot_api_range() {
    let yaml = "accounts:\n  - name: bad\n    llm:\n      allowed_chat_ids: [-9223372036854775808]\n";
    assert!(matches!(AppConfig::parse(yaml), Err(Error::Config(_))));
    assert!(!is_bot_api_chat_id(0));
    assert!(is_bot_api_chat_id(-100222));
}

// ============================================================================
// Session Tests
// ============================================================================

#[test]
fn test_session_lock_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("nested").join("main.session");

    let first = SessionLock::acquire(&session).unwrap();
    assert!(lock_path(&session).exists());

    let second = SessionLock::acquire(&session);
    assert!(matches!(second, Err(Error::SessionLocked(_))));

    drop(first);
    assert!(SessionLock::acquire(&session).is_ok());
}

#[tokio::test]
async fn test_initialize_account_with_missing_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        "accounts:\n  - name: gone\n    session_file: {}\n",
        dir.path().join("gone.session").display()
    );
    let config = AppConfig::parse(&yaml).unwrap();
    let mut prompt = ScriptedPrompt::default();

    let result = initialize_account(&config.accounts[0], &creds(), &mut prompt).await;

    assert!(matches!(result, Err(Error::SessionNotFound(_))));
    assert!(prompt.asked.is_empty());
}

#[tokio::test]
async fn test_initialize_account_without_login_method() {
    let config = AppConfig::parse("accounts:\n  - name: nothing\n").unwrap();
    let mut prompt = ScriptedPrompt::default();

    let result = initialize_account(&config.accounts[0], &creds(), &mut prompt).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

// ============================================================================
// Handler Tests
// ============================================================================

#[test]
fn test_handlers_follow_account_config() {
    let config = AppConfig::parse(CONFIG_YAML).unwrap();

    let personal = AccountHandlers::from_config(config.account("personal").unwrap()).unwrap();
    let responder = personal.llm.as_ref().unwrap();
    assert!(responder.accepts(-1001234567890));
    assert!(!responder.accepts(1234567890));
    assert!(!responder.accepts(5));
    assert!(personal.media.is_none());

    let archive = AccountHandlers::from_config(config.account("archive").unwrap()).unwrap();
    let forwarder = archive.media.as_ref().unwrap();
    assert!(archive.llm.is_none());

    let photo = IncomingMessage {
        id: 1,
        chat_id: -100222,
        text: "look".to_string(),
        media: Some(MediaKind::Photo),
        outgoing: false,
    };
    assert!(forwarder.should_forward(&photo));
    assert_eq!(
        forwarder.build_caption(&photo.text, photo.chat_id),
        "look\n\n—\nFrom: -100222"
    );

    let from_user = IncomingMessage {
        chat_id: 100222,
        ..photo.clone()
    };
    assert!(!forwarder.should_forward(&from_user));
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_error_variants_display() {
    let cases = [
        (Error::SessionNotFound("a.session".into()), "Session file not found"),
        (Error::SessionLocked("a.session".into()), "locked"),
        (Error::NoAccounts, "No account"),
        (Error::InvalidApiCredentials, "api_id"),
        (Error::Llm("status 500".into()), "LLM"),
    ];
    for (err, needle) in cases {
        assert!(err.to_string().contains(needle), "{} lacks {}", err, needle);
    }
}

#[test]
fn test_result_type_alias() {
    fn returns_result() -> Result<i32> {
        Ok(42)
    }
    assert_eq!(returns_result().unwrap(), 42);
}

#[test]
fn test_llm_client_rejects_empty_url() {
    assert!(LlmClient::new("", None, Duration::from_secs(1)).is_err());
}
