//! Auto-reply to incoming text messages through an LLM endpoint

use std::collections::HashSet;
use std::time::Instant;

use grammers_client::types::Message;
use grammers_client::Client;
use grammers_session::defs::PeerRef;
use grammers_tl_types as tl;
use tracing::{debug, info, warn};

use super::IncomingMessage;
use crate::config::LlmConfig;
use crate::error::Result;
use crate::integrations::llm::{LlmClient, Sampling};
use crate::metrics;

pub struct LlmResponder {
    client: LlmClient,
    system_prompt: String,
    /// Bot API chat ids; empty means every chat
    allowed: HashSet<i64>,
    sampling: Sampling,
    error_message: String,
}

impl LlmResponder {
    /// `None` when the LLM is disabled for the account.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        Ok(Some(Self {
            client: LlmClient::from_config(config)?,
            system_prompt: config.system_prompt.clone(),
            allowed: config.allowed_chat_ids.iter().copied().collect(),
            sampling: Sampling::from(config),
            error_message: config.error_message.clone(),
        }))
    }

    /// Whether `chat_id` (Bot API form) is on the allow-list
    pub fn accepts(&self, chat_id: i64) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&chat_id)
    }

    pub fn should_process(&self, incoming: &IncomingMessage) -> bool {
        !incoming.outgoing && incoming.has_text() && self.accepts(incoming.chat_id)
    }

    /// Text to send back and whether the model actually answered.
    pub async fn reply_text(&self, user_message: &str) -> (String, bool) {
        match self
            .client
            .ask(&self.system_prompt, user_message, self.sampling)
            .await
        {
            Ok(answer) if !answer.is_empty() => (answer, true),
            Ok(_) => {
                warn!("LLM returned an empty answer");
                (self.error_message.clone(), false)
            }
            Err(e) => {
                warn!("LLM request failed: {}", e);
                (self.error_message.clone(), false)
            }
        }
    }

    pub async fn handle(
        &self,
        account: &str,
        client: &Client,
        msg: &Message,
        incoming: &IncomingMessage,
    ) {
        if !self.should_process(incoming) {
            return;
        }

        debug!(account, chat_id = incoming.chat_id, "Asking LLM");

        let peer: PeerRef = match msg.peer() {
            Ok(peer) => peer.into(),
            Err(peer_ref) => peer_ref,
        };
        if let Err(e) = client
            .action(peer)
            .oneshot(tl::enums::SendMessageAction::SendMessageTypingAction)
            .await
        {
            debug!(account, "Typing action failed: {}", e);
        }

        let started = Instant::now();
        let (text, answered) = self.reply_text(incoming.text.trim()).await;
        metrics::record_llm_reply(account, started.elapsed(), answered);

        match msg.respond(text).await {
            Ok(_) => info!(
                account,
                chat_id = incoming.chat_id,
                answered,
                "Replied to message {}",
                incoming.id
            ),
            Err(e) => warn!(account, chat_id = incoming.chat_id, "Failed to send reply: {}", e),
        }
    }
}
