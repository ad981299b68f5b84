//! External service integrations

pub mod llm;

pub use llm::{check_connection, ChatMessage, LlmClient, Sampling};
