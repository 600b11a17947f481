//! Discord messaging adapter using serenity.

use crate::error::MessagingError;
use crate::messaging::traits::{HistoryQuery, InboundStream, Messaging};
use crate::{BotIdentity, ChannelId, HistoryMessage, InboundEvent, InboundMessage, MessageId};

use serenity::all::{
    ChannelId as DiscordChannelId, Client, Context, CreateMessage, EventHandler, GatewayIntents,
    GetMessages, Http, Message, MessageId as DiscordMessageId, Ready, ShardManager,
};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

/// Forwards gateway events into the adapter's inbound channel.
struct Handler {
    inbound_tx: mpsc::Sender<InboundEvent>,
}

#[async_trait::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let identity = BotIdentity {
            id: ready.user.id.to_string().into(),
            username: ready.user.name.clone(),
        };

        if let Err(error) = self.inbound_tx.send(InboundEvent::Ready(identity)).await {
            tracing::warn!(%error, "failed to forward discord ready event (receiver dropped)");
        }
    }

    async fn message(&self, _ctx: Context, message: Message) {
        let inbound = InboundMessage {
            channel_id: message.channel_id.to_string().into(),
            message: history_message(&message),
        };

        if let Err(error) = self.inbound_tx.send(InboundEvent::Message(inbound)).await {
            tracing::warn!(
                %error,
                "failed to send inbound message from Discord (receiver dropped)"
            );
        }
    }
}

/// Discord adapter state.
pub struct DiscordAdapter {
    token: String,
    http: Arc<RwLock<Option<Arc<Http>>>>,
    shard_manager: Arc<RwLock<Option<Arc<ShardManager>>>>,
}

impl DiscordAdapter {
    /// Create a new Discord adapter.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            http: Arc::new(RwLock::new(None)),
            shard_manager: Arc::new(RwLock::new(None)),
        }
    }

    async fn http(&self) -> Result<Arc<Http>, MessagingError> {
        self.http
            .read()
            .await
            .clone()
            .ok_or(MessagingError::NotStarted)
    }
}

impl Messaging for DiscordAdapter {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> crate::Result<InboundStream> {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);

        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(&self.token, intents)
            .event_handler(Handler { inbound_tx })
            .await
            .map_err(transport_error)?;

        *self.http.write().await = Some(client.http.clone());
        *self.shard_manager.write().await = Some(client.shard_manager.clone());

        tokio::spawn(async move {
            if let Err(error) = client.start().await {
                tracing::error!(%error, "discord client stopped");
            }
        });

        tracing::info!("discord connecting");

        let stream = tokio_stream::wrappers::ReceiverStream::new(inbound_rx);
        Ok(Box::pin(stream))
    }

    async fn fetch_history(
        &self,
        channel_id: &ChannelId,
        query: HistoryQuery,
    ) -> crate::Result<Vec<HistoryMessage>> {
        let http = self.http().await?;
        let channel = discord_channel_id(channel_id)?;

        let mut builder = GetMessages::new().limit(query.limit);
        if let Some(after) = &query.after {
            builder = builder.after(discord_message_id(after)?);
        }

        let messages = channel
            .messages(&http, builder)
            .await
            .map_err(transport_error)?;

        // Discord returns newest first.
        Ok(messages.iter().rev().map(history_message).collect())
    }

    async fn send(&self, channel_id: &ChannelId, text: &str) -> crate::Result<()> {
        let http = self.http().await?;
        discord_channel_id(channel_id)?
            .say(&http, text)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn reply(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        text: &str,
    ) -> crate::Result<()> {
        let http = self.http().await?;
        let channel = discord_channel_id(channel_id)?;
        let message = discord_message_id(message_id)?;

        let builder = CreateMessage::new()
            .content(text)
            .reference_message((channel, message));

        channel
            .send_message(&http, builder)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send_typing(&self, channel_id: &ChannelId) -> crate::Result<()> {
        let http = self.http().await?;
        discord_channel_id(channel_id)?
            .broadcast_typing(&http)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn shutdown(&self) -> crate::Result<()> {
        if let Some(shard_manager) = self.shard_manager.write().await.take() {
            shard_manager.shutdown_all().await;
        }
        self.http.write().await.take();
        tracing::info!("discord adapter shut down");
        Ok(())
    }
}

fn history_message(message: &Message) -> HistoryMessage {
    HistoryMessage {
        id: message.id.to_string().into(),
        author_id: message.author.id.to_string().into(),
        author_name: message.author.name.clone(),
        content: message.content.clone(),
        timestamp: *message.timestamp,
        reply_to: message
            .message_reference
            .as_ref()
            .and_then(|reference| reference.message_id)
            .map(|id| id.to_string().into()),
    }
}

fn parse_snowflake(raw: &str) -> Result<u64, MessagingError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| MessagingError::InvalidId(raw.to_string()))
}

fn discord_channel_id(raw: &str) -> Result<DiscordChannelId, MessagingError> {
    parse_snowflake(raw).map(DiscordChannelId::new)
}

fn discord_message_id(raw: &str) -> Result<DiscordMessageId, MessagingError> {
    parse_snowflake(raw).map(DiscordMessageId::new)
}

/// Map a serenity failure, keeping 429s distinguishable for the failure classifier.
fn transport_error(error: serenity::Error) -> MessagingError {
    if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) =
        &error
        && response.status_code.as_u16() == 429
    {
        return MessagingError::RateLimited { retry_after: None };
    }
    MessagingError::Transport(error.to_string())
}
