//! Reply generation: typing signal, human-looking pause, one completion call.

use crate::ChannelId;
use crate::conversation::ConversationTurn;
use crate::error::Result;
use crate::llm::TextGenerator;
use crate::messaging::MessagingDyn;

use rand::Rng as _;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// Pause before calling the service, in milliseconds.
pub const TYPING_DELAY_MS: RangeInclusive<u64> = 2_500..=6_000;

/// Sent when the service answers with no content.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "...";

/// Produces the reply text for one generation attempt.
#[derive(Clone)]
pub struct ResponseGenerator {
    client: Arc<dyn TextGenerator>,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn TextGenerator>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Signal typing, wait a random beat, then ask the service once.
    ///
    /// Typing failures are ignored. Service failures are returned untouched
    /// so the caller can classify them; there is no retry here.
    pub async fn respond(
        &self,
        messaging: &dyn MessagingDyn,
        channel_id: &ChannelId,
        turns: &[ConversationTurn],
    ) -> Result<String> {
        if let Err(error) = messaging.send_typing(channel_id).await {
            tracing::debug!(%channel_id, %error, "typing indicator failed");
        }

        let delay_ms = rand::rng().random_range(TYPING_DELAY_MS);
        tracing::debug!(%channel_id, delay_ms, "pausing before generation");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let reply = self.client.generate(turns).await?;

        Ok(reply.unwrap_or_else(|| EMPTY_REPLY_PLACEHOLDER.to_string()))
    }
}
