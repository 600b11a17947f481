//! Messaging trait and dynamic dispatch companion.

use crate::error::Result;
use crate::{ChannelId, HistoryMessage, InboundEvent, MessageId};
use futures::Stream;
use std::pin::Pin;

/// Event stream type.
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Which slice of a channel's history to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Maximum number of messages to return.
    pub limit: u8,
    /// Only return messages created after this one.
    pub after: Option<MessageId>,
}

impl HistoryQuery {
    /// The `limit` most recent messages in the channel.
    pub fn latest(limit: u8) -> Self {
        Self { limit, after: None }
    }

    /// Up to `limit` messages created after `message_id`.
    pub fn after(message_id: MessageId, limit: u8) -> Self {
        Self {
            limit,
            after: Some(message_id),
        }
    }
}

/// Static trait for messaging adapters.
/// Use this for type-safe implementations.
pub trait Messaging: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &str;

    /// Log in and return the inbound event stream.
    fn start(&self) -> impl std::future::Future<Output = Result<InboundStream>> + Send;

    /// Fetch messages from a channel, oldest first.
    fn fetch_history(
        &self,
        channel_id: &ChannelId,
        query: HistoryQuery,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryMessage>>> + Send;

    /// Post a standalone message.
    fn send(
        &self,
        channel_id: &ChannelId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Post a message attached as a reply to `message_id`.
    fn reply(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Show a transient typing indicator.
    fn send_typing(
        &self,
        _channel_id: &ChannelId,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    /// Graceful shutdown.
    fn shutdown(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn MessagingDyn>` for storing adapters.
pub trait MessagingDyn: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>>;

    fn fetch_history<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        query: HistoryQuery,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<HistoryMessage>>> + Send + 'a>>;

    fn send<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn reply<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        message_id: &'a MessageId,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn send_typing<'a>(
        &'a self,
        channel_id: &'a ChannelId,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn shutdown<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing Messaging automatically implements MessagingDyn.
impl<T: Messaging> MessagingDyn for T {
    fn name(&self) -> &str {
        Messaging::name(self)
    }

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<InboundStream>> + Send + 'a>> {
        Box::pin(Messaging::start(self))
    }

    fn fetch_history<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        query: HistoryQuery,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<HistoryMessage>>> + Send + 'a>> {
        Box::pin(Messaging::fetch_history(self, channel_id, query))
    }

    fn send<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Messaging::send(self, channel_id, text))
    }

    fn reply<'a>(
        &'a self,
        channel_id: &'a ChannelId,
        message_id: &'a MessageId,
        text: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Messaging::reply(self, channel_id, message_id, text))
    }

    fn send_typing<'a>(
        &'a self,
        channel_id: &'a ChannelId,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Messaging::send_typing(self, channel_id))
    }

    fn shutdown<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Messaging::shutdown(self))
    }
}
