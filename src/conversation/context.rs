//! Context window assembly: recent history in, role-tagged turns out.

use crate::conversation::{ConversationTurn, truncate_chars};
use crate::error::Result;
use crate::messaging::{HistoryQuery, MessagingDyn};
use crate::{HistoryMessage, InboundMessage};
use std::collections::HashMap;

/// How many recent messages make up the context window.
pub const HISTORY_WINDOW: u8 = 30;

/// Characters of each message body kept in its turn.
pub const MAX_BODY_CHARS: usize = 100;

/// Characters of a replied-to message quoted in the attribution.
pub const MAX_QUOTE_CHARS: usize = 30;

/// Fetch the recent window around `trigger` and turn it into generation input.
pub async fn build_context(
    messaging: &dyn MessagingDyn,
    trigger: &InboundMessage,
    bot_id: &str,
    system_directive: &str,
) -> Result<Vec<ConversationTurn>> {
    let window = messaging
        .fetch_history(&trigger.channel_id, HistoryQuery::latest(HISTORY_WINDOW))
        .await?;

    tracing::debug!(
        channel_id = %trigger.channel_id,
        fetched = window.len(),
        "context window fetched"
    );

    Ok(assemble_context(window, bot_id, system_directive))
}

/// Order the window, annotate replies, and map each message to a turn.
///
/// The system turn always comes first. Reply references are only resolved
/// against messages inside `window`.
pub fn assemble_context(
    mut window: Vec<HistoryMessage>,
    bot_id: &str,
    system_directive: &str,
) -> Vec<ConversationTurn> {
    // Stable, so equal timestamps keep source order.
    window.sort_by_key(|message| message.timestamp);

    let by_id: HashMap<&str, &HistoryMessage> = window
        .iter()
        .map(|message| (message.id.as_ref(), message))
        .collect();

    let mut turns = Vec::with_capacity(window.len() + 1);
    turns.push(ConversationTurn::system(system_directive.trim()));

    for message in &window {
        let body = truncate_chars(&message.content, MAX_BODY_CHARS);
        if message.author_id.as_ref() == bot_id {
            turns.push(ConversationTurn::assistant(body));
        } else {
            let annotation = reply_annotation(message, &by_id);
            turns.push(ConversationTurn::user(format!(
                "{}: {annotation}{body}",
                message.author_name
            )));
        }
    }

    turns
}

fn reply_annotation(message: &HistoryMessage, by_id: &HashMap<&str, &HistoryMessage>) -> String {
    let Some(replied) = message
        .reply_to
        .as_deref()
        .and_then(|reply_id| by_id.get(reply_id))
    else {
        return String::new();
    };

    format!(
        "(in response to {}: \"{}\") ",
        replied.author_name,
        truncate_chars(&replied.content, MAX_QUOTE_CHARS)
    )
}
