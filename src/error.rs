//! Error types for the account manager

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session file not found: {0}")]
    SessionNotFound(String),

    #[error("Session is locked by another process: {0}")]
    SessionLocked(String),

    #[error("Failed to acquire session lock: {0}")]
    LockError(String),

    #[error("Session is not authorized: {0}")]
    Unauthorized(String),

    #[error("Invalid api_id or api_hash")]
    InvalidApiCredentials,

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Config file not found: {0} (copy config.example.yml or run `setup`)")]
    ConfigNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("No account could be initialized")]
    NoAccounts,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<grammers_client::InvocationError> for Error {
    fn from(err: grammers_client::InvocationError) -> Self {
        let text = err.to_string();
        if text.contains("API_ID_INVALID") {
            Error::InvalidApiCredentials
        } else if text.contains("AUTH_KEY_UNREGISTERED") {
            Error::Unauthorized(text)
        } else {
            Error::TelegramError(text)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}
