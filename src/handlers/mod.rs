//! Incoming-message handlers attached to each account.
//!
//! Each account gets an [`AccountHandlers`] built from its config; every
//! incoming message is passed to the media forwarder and the LLM responder
//! independently.

pub mod llm;
pub mod media;

use chrono::{DateTime, Utc};
use grammers_client::types::peer::Peer;
use grammers_client::types::Message;
use grammers_client::Client;
use grammers_session::defs::PeerRef;
use tracing::info;

use crate::chat::peer_name;
use crate::config::AccountConfig;
use crate::error::Result;
use crate::metrics;

pub use llm::LlmResponder;
pub use media::{MediaForwarder, MediaKind};

/// Longest text shown by `show_incoming`
const PREVIEW_CHARS: usize = 150;

/// Library-independent view of a received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: i32,
    /// Bot API dialog id of the chat the message arrived in
    pub chat_id: i64,
    pub text: String,
    pub media: Option<MediaKind>,
    pub outgoing: bool,
}

impl IncomingMessage {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            id: msg.id(),
            chat_id: msg.peer_id().bot_api_dialog_id(),
            text: msg.text().to_string(),
            media: msg.media().as_ref().map(MediaKind::of),
            outgoing: msg.outgoing(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Handlers enabled for one account
pub struct AccountHandlers {
    pub account: String,
    pub llm: Option<LlmResponder>,
    pub media: Option<MediaForwarder>,
    pub show_incoming: bool,
}

impl AccountHandlers {
    pub fn from_config(account: &AccountConfig) -> Result<Self> {
        let llm = LlmResponder::from_config(&account.llm)?;
        if llm.is_some() {
            info!(account = %account.name, "LLM responder enabled");
        }

        let media = MediaForwarder::from_config(&account.media_forward);
        if let Some(forwarder) = &media {
            info!(
                account = %account.name,
                sources = ?forwarder.source_chat_ids(),
                "Media forwarder enabled"
            );
        }

        Ok(Self {
            account: account.name.clone(),
            llm,
            media,
            show_incoming: account.show_incoming,
        })
    }

    /// True when no handler would ever act
    pub fn is_idle(&self) -> bool {
        self.llm.is_none() && self.media.is_none() && !self.show_incoming
    }

    /// Run every enabled handler on one message. Handler failures are logged, never returned.
    pub async fn dispatch(&self, client: &Client, msg: &Message) {
        let incoming = IncomingMessage::from_message(msg);
        if incoming.outgoing {
            return;
        }

        metrics::record_incoming(&self.account);

        if self.show_incoming {
            let sender = msg
                .sender()
                .map(peer_name)
                .unwrap_or_else(|| "?".to_string());
            let chat = chat_label(msg.peer());
            info!(
                account = %self.account,
                "{}",
                describe_incoming(msg.date(), &sender, &chat, &incoming)
            );
        }

        let forward = async {
            if let Some(media) = &self.media {
                media.handle(&self.account, client, msg, &incoming).await;
            }
        };
        let reply = async {
            if let Some(llm) = &self.llm {
                llm.handle(&self.account, client, msg, &incoming).await;
            }
        };
        tokio::join!(forward, reply);
    }
}

/// Chat name, or its id when the peer is not cached yet
fn chat_label(peer: std::result::Result<&Peer, PeerRef>) -> String {
    match peer {
        Ok(peer) => peer_name(peer),
        Err(peer_ref) => format!("chat {}", peer_ref.id.bot_api_dialog_id()),
    }
}

/// One-line summary of an incoming message.
pub fn describe_incoming(
    date: DateTime<Utc>,
    sender: &str,
    chat: &str,
    incoming: &IncomingMessage,
) -> String {
    let text = if incoming.has_text() {
        preview(&incoming.text, PREVIEW_CHARS)
    } else {
        "(media without text)".to_string()
    };
    format!(
        "New message ({}) from {} in {}: {}",
        date.format("%d.%m.%Y %H:%M:%S"),
        sender,
        chat,
        text
    )
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
