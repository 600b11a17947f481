//! In-memory collaborators for unit tests.

use crate::conversation::ConversationTurn;
use crate::error::{LlmError, MessagingError, Result};
use crate::llm::TextGenerator;
use crate::messaging::{HistoryQuery, InboundStream, Messaging};
use crate::{ChannelId, HistoryMessage, InboundMessage, MessageId};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub(crate) fn history(
    id: &str,
    author_id: &str,
    author_name: &str,
    content: &str,
    seconds: i64,
) -> HistoryMessage {
    HistoryMessage {
        id: id.into(),
        author_id: author_id.into(),
        author_name: author_name.into(),
        content: content.into(),
        timestamp: chrono::DateTime::from_timestamp(1_700_000_000 + seconds, 0)
            .unwrap_or_default(),
        reply_to: None,
    }
}

pub(crate) fn inbound(channel_id: &str, message: HistoryMessage) -> InboundMessage {
    InboundMessage {
        channel_id: channel_id.into(),
        message,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outgoing {
    Send {
        channel_id: ChannelId,
        text: String,
    },
    Reply {
        channel_id: ChannelId,
        message_id: MessageId,
        text: String,
    },
}

/// A channel transport that serves canned history and records what was posted.
#[derive(Default)]
pub(crate) struct FakeChannel {
    history: Vec<HistoryMessage>,
    newer: Mutex<Vec<HistoryMessage>>,
    queries: Mutex<Vec<HistoryQuery>>,
    outbox: Mutex<Vec<Outgoing>>,
    typing: AtomicUsize,
    fail_typing: bool,
    fail_send: bool,
}

impl FakeChannel {
    pub(crate) fn with_history(history: Vec<HistoryMessage>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub(crate) fn failing_typing(mut self) -> Self {
        self.fail_typing = true;
        self
    }

    pub(crate) fn failing_sends(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Messages returned for "created after the trigger" queries.
    pub(crate) fn set_newer(&self, newer: Vec<HistoryMessage>) {
        *self.newer.lock().unwrap() = newer;
    }

    pub(crate) fn history_queries(&self) -> Vec<HistoryQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn outbox(&self) -> Vec<Outgoing> {
        self.outbox.lock().unwrap().clone()
    }

    pub(crate) fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }
}

impl Messaging for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start(&self) -> Result<InboundStream> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn fetch_history(
        &self,
        _channel_id: &ChannelId,
        query: HistoryQuery,
    ) -> Result<Vec<HistoryMessage>> {
        self.queries.lock().unwrap().push(query.clone());
        let limit = usize::from(query.limit);
        if query.after.is_some() {
            let newer = self.newer.lock().unwrap();
            return Ok(newer.iter().take(limit).cloned().collect());
        }
        let skip = self.history.len().saturating_sub(limit);
        Ok(self.history.iter().skip(skip).cloned().collect())
    }

    async fn send(&self, channel_id: &ChannelId, text: &str) -> Result<()> {
        if self.fail_send {
            return Err(MessagingError::Transport("send refused".into()).into());
        }
        self.outbox.lock().unwrap().push(Outgoing::Send {
            channel_id: channel_id.clone(),
            text: text.into(),
        });
        Ok(())
    }

    async fn reply(&self, channel_id: &ChannelId, message_id: &MessageId, text: &str) -> Result<()> {
        if self.fail_send {
            return Err(MessagingError::Transport("reply refused".into()).into());
        }
        self.outbox.lock().unwrap().push(Outgoing::Reply {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            text: text.into(),
        });
        Ok(())
    }

    async fn send_typing(&self, _channel_id: &ChannelId) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        if self.fail_typing {
            return Err(MessagingError::Transport("typing refused".into()).into());
        }
        Ok(())
    }
}

/// A generation service that replays scripted outcomes in order.
///
/// When a release handle is set, every call waits for it before answering.
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    outcomes: Mutex<VecDeque<std::result::Result<Option<String>, LlmError>>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
    release: Option<Arc<Notify>>,
}

impl ScriptedGenerator {
    pub(crate) fn replying(text: &str) -> Self {
        Self::with_outcomes(vec![Ok(Some(text.into()))])
    }

    pub(crate) fn with_outcomes(
        outcomes: Vec<std::result::Result<Option<String>, LlmError>>,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub(crate) fn stalled_until(mut self, release: Arc<Notify>) -> Self {
        self.release = Some(release);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        turns: &[ConversationTurn],
    ) -> std::result::Result<Option<String>, LlmError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        if let Some(release) = &self.release {
            release.notified().await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}
