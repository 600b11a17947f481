//! Mimicbot: a chat participant that answers in the voice of the channel it sits in.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod logging;
pub mod messaging;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

use std::sync::Arc;

/// Channel identifier type.
pub type ChannelId = Arc<str>;

/// Message identifier type.
pub type MessageId = Arc<str>;

/// User identifier type.
pub type UserId = Arc<str>;

/// The identity the transport logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub username: String,
}

/// A message as it appears in a channel's history.
///
/// Fetched from the transport and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub author_id: UserId,
    /// Platform username of the author, used verbatim in the prompt.
    pub author_name: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// The message this one replies to, when the platform recorded one.
    pub reply_to: Option<MessageId>,
}

/// A message that just arrived in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: ChannelId,
    pub message: HistoryMessage,
}

impl InboundMessage {
    pub fn id(&self) -> &MessageId {
        &self.message.id
    }

    pub fn author_id(&self) -> &UserId {
        &self.message.author_id
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// Events delivered by a messaging adapter.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// The transport finished logging in.
    Ready(BotIdentity),
    /// A message was created in a channel the transport can see.
    Message(InboundMessage),
}
