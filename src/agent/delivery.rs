//! Post the generated reply, threaded or not depending on what happened meanwhile.

use crate::InboundMessage;
use crate::error::Result;
use crate::messaging::{HistoryQuery, MessagingDyn};

/// How a reply was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Nothing newer than the trigger: a plain message in the channel.
    Standalone,
    /// The conversation moved on: attach to the trigger as a reply.
    Reply,
}

/// Check for activity after `trigger` and pick a delivery mode.
///
/// Best effort: new messages can still land between this check and the post.
pub async fn resolve_mode(
    messaging: &dyn MessagingDyn,
    trigger: &InboundMessage,
) -> Result<DeliveryMode> {
    let newer = messaging
        .fetch_history(
            &trigger.channel_id,
            HistoryQuery::after(trigger.id().clone(), 1),
        )
        .await?;

    Ok(if newer.is_empty() {
        DeliveryMode::Standalone
    } else {
        DeliveryMode::Reply
    })
}

pub async fn deliver(
    messaging: &dyn MessagingDyn,
    trigger: &InboundMessage,
    text: &str,
) -> Result<DeliveryMode> {
    let mode = resolve_mode(messaging, trigger).await?;

    match mode {
        DeliveryMode::Standalone => {
            messaging.send(&trigger.channel_id, text).await?;
            tracing::info!(
                event = "message_sent",
                channel_id = %trigger.channel_id,
                "sent without reply"
            );
        }
        DeliveryMode::Reply => {
            messaging
                .reply(&trigger.channel_id, trigger.id(), text)
                .await?;
            tracing::info!(
                event = "message_reply_sent",
                channel_id = %trigger.channel_id,
                reply_to = %trigger.id(),
                "sent with reply"
            );
        }
    }

    Ok(mode)
}
