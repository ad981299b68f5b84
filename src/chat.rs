//! Chat identity helpers and dialog lookup

use std::path::Path;

use grammers_client::types::peer::Peer;
use grammers_client::Client;
use grammers_tl_types as tl;
use serde::{Deserialize, Serialize};

use crate::config::marked_channel_id;
use crate::error::{Error, Result};

/// Output of `chat-ids`
pub const CHAT_IDS_FILE: &str = "chat_ids.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    User,
    /// Basic group
    Group,
    /// Megagroup (channel-backed group)
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatKind::User => "user",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }

    /// Bot API style dialog id for a bare peer id
    pub fn bot_api_id(self, bare_id: i64) -> i64 {
        match self {
            ChatKind::User => bare_id,
            ChatKind::Group => -bare_id,
            ChatKind::Supergroup | ChatKind::Channel => marked_channel_id(bare_id),
        }
    }
}

/// Bare peer id and kind
pub fn peer_identity(peer: &Peer) -> (i64, ChatKind) {
    match peer {
        Peer::User(u) => (u.raw.id(), ChatKind::User),
        Peer::Group(g) => match &g.raw {
            tl::enums::Chat::Empty(c) => (c.id, ChatKind::Group),
            tl::enums::Chat::Chat(c) => (c.id, ChatKind::Group),
            tl::enums::Chat::Forbidden(c) => (c.id, ChatKind::Group),
            tl::enums::Chat::Channel(c) => (c.id, ChatKind::Supergroup),
            tl::enums::Chat::ChannelForbidden(c) => (c.id, ChatKind::Supergroup),
        },
        Peer::Channel(c) => (c.raw.id, ChatKind::Channel),
    }
}

/// Get the display name for a peer
pub fn peer_name(peer: &Peer) -> String {
    peer.name()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "(untitled)".to_string())
}

/// Whether a peer with this bare id and kind is the chat `id` (Bot API form).
pub fn matches_chat_id(bare_id: i64, kind: ChatKind, id: i64) -> bool {
    kind.bot_api_id(bare_id) == id
}

/// Find a chat among the account's dialogs by its Bot API id
/// (`-100…` channel, `-id` group, positive user).
pub async fn resolve_chat_by_id(client: &Client, id: i64) -> Result<Peer> {
    let mut dialogs = client.iter_dialogs();

    while let Some(dialog) = dialogs
        .next()
        .await
        .map_err(|e| Error::TelegramError(e.to_string()))?
    {
        let (bare_id, kind) = peer_identity(&dialog.peer);
        if matches_chat_id(bare_id, kind, id) {
            return Ok(dialog.peer.clone());
        }
    }

    Err(Error::ChatNotFound(format!("{} not found in dialogs", id)))
}

/// One dialog as shown by `chat-ids`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogInfo {
    pub name: String,
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

impl DialogInfo {
    pub fn from_peer(peer: &Peer) -> Self {
        let (bare_id, kind) = peer_identity(peer);
        Self {
            name: peer_name(peer),
            id: kind.bot_api_id(bare_id),
            kind,
        }
    }
}

/// Up to `limit` most recent dialogs
pub async fn list_dialogs(client: &Client, limit: usize) -> Result<Vec<DialogInfo>> {
    let mut dialogs = client.iter_dialogs();
    let mut result = Vec::new();

    while result.len() < limit {
        match dialogs
            .next()
            .await
            .map_err(|e| Error::TelegramError(e.to_string()))?
        {
            Some(dialog) => result.push(DialogInfo::from_peer(&dialog.peer)),
            None => break,
        }
    }

    Ok(result)
}

pub fn write_chat_ids(path: &Path, dialogs: &[DialogInfo]) -> Result<()> {
    let json = serde_json::to_string_pretty(dialogs)?;
    std::fs::write(path, json)?;
    Ok(())
}
