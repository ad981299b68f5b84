//! Copy photos and videos from watched chats into an archive channel

use std::collections::HashSet;

use grammers_client::types::peer::Peer;
use grammers_client::types::{InputMessage, Media, Message};
use grammers_client::Client;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::IncomingMessage;
use crate::chat::resolve_chat_by_id;
use crate::config::MediaForwardConfig;
use crate::error::Result;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    /// Any non-video file
    Document,
    Other,
}

impl MediaKind {
    pub fn of(media: &Media) -> Self {
        match media {
            Media::Photo(_) => MediaKind::Photo,
            Media::Document(doc) => Self::from_mime(doc.mime_type()),
            _ => MediaKind::Other,
        }
    }

    fn from_mime(mime: Option<&str>) -> Self {
        match mime {
            Some(m) if m.starts_with("video/") => MediaKind::Video,
            _ => MediaKind::Document,
        }
    }
}

pub struct MediaForwarder {
    /// Bot API ids of the watched chats
    sources: HashSet<i64>,
    target_channel_id: i64,
    include_captions: bool,
    include_documents: bool,
    target: OnceCell<Peer>,
}

impl MediaForwarder {
    /// `None` when disabled or when sources/target are missing.
    pub fn from_config(config: &MediaForwardConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let target_channel_id = match config.target_channel_id {
            Some(id) if id != 0 && !config.source_chat_ids.is_empty() => id,
            _ => {
                warn!("Media forwarding enabled but source_chat_ids or target_channel_id is missing");
                return None;
            }
        };

        Some(Self {
            sources: config.source_chat_ids.iter().copied().collect(),
            target_channel_id,
            include_captions: config.include_captions,
            include_documents: config.include_documents,
            target: OnceCell::new(),
        })
    }

    /// Watched chats, sorted
    pub fn source_chat_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.sources.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn target_channel_id(&self) -> i64 {
        self.target_channel_id
    }

    pub fn should_forward(&self, incoming: &IncomingMessage) -> bool {
        if !self.sources.contains(&incoming.chat_id) {
            return false;
        }
        match incoming.media {
            Some(MediaKind::Photo) | Some(MediaKind::Video) => true,
            Some(MediaKind::Document) => self.include_documents,
            Some(MediaKind::Other) | None => false,
        }
    }

    /// Caption for the copy. With `include_captions` the source chat is appended,
    /// otherwise the original text is kept as is.
    pub fn build_caption(&self, text: &str, chat_id: i64) -> String {
        if !self.include_captions {
            return text.to_string();
        }
        let text = text.trim();
        if text.is_empty() {
            format!("From: {}", chat_id)
        } else {
            format!("{}\n\n—\nFrom: {}", text, chat_id)
        }
    }

    async fn target_peer(&self, client: &Client) -> Result<&Peer> {
        self.target
            .get_or_try_init(|| resolve_chat_by_id(client, self.target_channel_id))
            .await
    }

    async fn forward(&self, client: &Client, media: Media, incoming: &IncomingMessage) -> Result<()> {
        let target = self.target_peer(client).await?;
        let caption = self.build_caption(&incoming.text, incoming.chat_id);
        client
            .send_message(target, InputMessage::new().text(caption).copy_media(&media))
            .await?;
        Ok(())
    }

    pub async fn handle(
        &self,
        account: &str,
        client: &Client,
        msg: &Message,
        incoming: &IncomingMessage,
    ) {
        if !self.should_forward(incoming) {
            return;
        }
        let Some(media) = msg.media() else {
            return;
        };

        match self.forward(client, media, incoming).await {
            Ok(()) => {
                metrics::record_media_forward(account, true);
                info!(
                    account,
                    from = incoming.chat_id,
                    to = self.target_channel_id,
                    "Forwarded {:?} from message {}",
                    incoming.media,
                    incoming.id
                );
            }
            Err(e) => {
                metrics::record_media_forward(account, false);
                warn!(account, from = incoming.chat_id, "Media forward failed: {}", e);
            }
        }
    }
}
