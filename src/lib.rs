//! Telegram Multi-Account Automation Library
//!
//! This library provides tools to:
//! - Authorize several Telegram user accounts and reuse their sessions
//! - Auto-reply to incoming messages through an LLM HTTP endpoint
//! - Copy photos and videos from watched chats into an archive channel
//! - Run all configured accounts side by side with Prometheus metrics

pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod input;
pub mod integrations;
pub mod metrics;
pub mod session;
pub mod supervisor;

// Re-export common types
pub use config::{is_bot_api_chat_id, normalize_chat_id, AccountConfig, ApiCredentials, AppConfig};
pub use error::{Error, Result};
pub use handlers::{AccountHandlers, LlmResponder, MediaForwarder, MediaKind};
pub use input::{Prompt, ScriptedPrompt, StdinPrompt};
pub use integrations::LlmClient;
pub use session::{check_session_exists, initialize_account, SessionLock, TelegramClient};
pub use supervisor::AccountManager;

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
