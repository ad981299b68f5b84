//! Configuration for Telegram API credentials and managed accounts
//!
//! Loads configuration from config.yml (or config.json, which is valid YAML)

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::input::Prompt;

/// Config files tried when no explicit path is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &["config.yml", "config.json"];
pub const SESSIONS_DIR: &str = "sessions";
pub const SESSION_EXTENSION: &str = "session";

/// Value shipped in example configs, treated as "not configured"
pub const PLACEHOLDER_API_HASH: &str = "your_api_hash_here";

pub const DEFAULT_LLM_API_URL: &str = "http://127.0.0.1:5000/api/v1/chat/completions";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant in Telegram.";
pub const DEFAULT_LLM_ERROR_MESSAGE: &str =
    "Sorry, the service is temporarily unavailable. Please try again later.";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Bot API channel ids are `-(10^12 + bare_id)`
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Bounds of Bot API dialog ids (users up to 2^40 - 1, channels down to -4 * 10^12)
const MIN_BOT_API_ID: i64 = -4_000_000_000_000;
const MAX_BOT_API_ID: i64 = 0xff_ffff_ffff;

/// Root of config.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramCredentials,

    /// Address for the Prometheus endpoint (e.g. 0.0.0.0:9898)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<String>,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramCredentials {
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_hash: Option<String>,
}

/// Resolved API credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_id: i32,
    pub api_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,

    /// Ready-made session file to load instead of logging in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Log every incoming message for this account
    #[serde(default)]
    pub show_incoming: bool,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub media_forward: MediaForwardConfig,
}

impl AccountConfig {
    /// Session file used by this account
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| default_session_path(&self.name))
    }

    /// Reject chat ids outside the Bot API ranges. A zero target only disables forwarding.
    fn validate_chat_ids(&self) -> Result<()> {
        let target = self.media_forward.target_channel_id.filter(|&id| id != 0);
        let ids = self
            .llm
            .allowed_chat_ids
            .iter()
            .chain(&self.media_forward.source_chat_ids)
            .chain(target.as_ref());

        for &id in ids {
            if !is_bot_api_chat_id(id) {
                return Err(Error::Config(format!(
                    "account '{}': {} is not a Bot API chat id",
                    self.name, id
                )));
            }
        }
        Ok(())
    }
}

/// `sessions/<name>.session`
pub fn default_session_path(name: &str) -> PathBuf {
    Path::new(SESSIONS_DIR).join(format!("{}.{}", name, SESSION_EXTENSION))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Empty list means every chat
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_api_url(),
            system_prompt: default_system_prompt(),
            allowed_chat_ids: Vec::new(),
            api_key: None,
            timeout: DEFAULT_LLM_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
            error_message: default_error_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaForwardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub source_chat_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_channel_id: Option<i64>,
    #[serde(default = "default_true")]
    pub include_captions: bool,
    /// Forward non-video documents too
    #[serde(default)]
    pub include_documents: bool,
}

impl Default for MediaForwardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_chat_ids: Vec::new(),
            target_channel_id: None,
            include_captions: true,
            include_documents: false,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_LLM_API_URL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_error_message() -> String {
    DEFAULT_LLM_ERROR_MESSAGE.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_true() -> bool {
    true
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Replace a `${VAR}` value with the environment variable, if set
fn resolve_placeholder(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        if let Ok(env_val) = std::env::var(var_name) {
            return env_val;
        }
    }
    value.to_string()
}

fn resolve_placeholder_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = resolve_placeholder(v);
    }
}

/// Convert a Bot API style id (`-100…` channel, negative group) to the bare peer id.
///
/// The peer kind is lost, so bare ids are only good for display. Matching is
/// done on the Bot API form.
pub fn normalize_chat_id(id: i64) -> i64 {
    if id <= -CHANNEL_ID_OFFSET {
        id.saturating_neg().saturating_sub(CHANNEL_ID_OFFSET)
    } else if id < 0 {
        -id
    } else {
        id
    }
}

/// Whether `id` is a Bot API dialog id: positive for users, `-id` for basic
/// groups, `-100…` for channels and supergroups.
pub fn is_bot_api_chat_id(id: i64) -> bool {
    id != 0 && id != -CHANNEL_ID_OFFSET && (MIN_BOT_API_ID..=MAX_BOT_API_ID).contains(&id)
}

/// Bot API style id for a channel or supergroup
pub fn marked_channel_id(bare_id: i64) -> i64 {
    -(CHANNEL_ID_OFFSET + bare_id)
}

impl AppConfig {
    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load the config from an explicit path or the first default file that exists
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        DEFAULT_CONFIG_FILES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Self::load)
            .unwrap_or_else(|| Err(Error::ConfigNotFound(DEFAULT_CONFIG_FILES[0].to_string())))
    }

    /// Load configuration from a specific file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut config = Self::parse(&content)?;
        config.resolve_env();
        Ok(config)
    }

    /// Parse and validate without touching the environment
    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_env(&mut self) {
        resolve_placeholder_opt(&mut self.telegram.api_id);
        resolve_placeholder_opt(&mut self.telegram.api_hash);
        resolve_placeholder_opt(&mut self.metrics_addr);

        for account in &mut self.accounts {
            resolve_placeholder_opt(&mut account.phone);
            resolve_placeholder_opt(&mut account.llm.api_key);
            account.llm.api_url = resolve_placeholder(&account.llm.api_url);
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(Error::Config("account name must not be empty".to_string()));
            }
            if !seen.insert(account.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate account name '{}'",
                    account.name
                )));
            }
            account.validate_chat_ids()?;
        }
        Ok(())
    }

    /// Write the config; `.json` paths get JSON, everything else YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => serde_yaml::to_string(self)?,
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Get an account by name
    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Resolve api_id/api_hash: config first, then TELEGRAM_API_ID/TELEGRAM_API_HASH,
    /// then ask interactively.
    pub fn api_credentials(&self, prompt: &mut dyn Prompt) -> Result<ApiCredentials> {
        if let (Some(id), Some(hash)) = (&self.telegram.api_id, &self.telegram.api_hash) {
            if !id.is_empty() && !hash.is_empty() && hash != PLACEHOLDER_API_HASH {
                let api_id = id.parse::<i32>().map_err(|_| {
                    Error::Config(format!("telegram.api_id must be a number, got '{}'", id))
                })?;
                return Ok(ApiCredentials {
                    api_id,
                    api_hash: hash.clone(),
                });
            }
        }

        if let Some(creds) = credentials_from_env() {
            return Ok(creds);
        }

        println!("\n⚠ API credentials not found. Enter them manually:");
        println!("(get them at https://my.telegram.org/apps)");
        prompt_credentials(prompt)
    }
}

/// TELEGRAM_API_ID / TELEGRAM_API_HASH, when both are set and valid
pub fn credentials_from_env() -> Option<ApiCredentials> {
    let id = std::env::var("TELEGRAM_API_ID").ok()?;
    let hash = std::env::var("TELEGRAM_API_HASH").ok()?;
    if hash.trim().is_empty() {
        return None;
    }
    let api_id = id.trim().parse::<i32>().ok()?;
    Some(ApiCredentials {
        api_id,
        api_hash: hash.trim().to_string(),
    })
}

/// Ask for api_id and api_hash
pub fn prompt_credentials(prompt: &mut dyn Prompt) -> Result<ApiCredentials> {
    let api_id = prompt
        .read_line("api_id: ")?
        .parse::<i32>()
        .map_err(|_| Error::Config("api_id must be a number".to_string()))?;

    let api_hash = prompt.read_line("api_hash: ")?;
    if api_hash.is_empty() {
        return Err(Error::Config("api_hash must not be empty".to_string()));
    }

    Ok(ApiCredentials { api_id, api_hash })
}
