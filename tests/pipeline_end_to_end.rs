//! End-to-end runs of the auto-responder against an in-memory channel.

use mimicbot::agent::{AgentDeps, Admission, Pipeline};
use mimicbot::config::LlmConfig;
use mimicbot::conversation::{ConversationTurn, Role};
use mimicbot::error::LlmError;
use mimicbot::llm::{GroqModel, ResponseGenerator, TextGenerator};
use mimicbot::messaging::{HistoryQuery, InboundStream, Messaging};
use mimicbot::{BotIdentity, ChannelId, HistoryMessage, InboundEvent, InboundMessage, MessageId};

use httpmock::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const BOT_ID: &str = "100";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Posted {
    Message { channel_id: String, text: String },
    Reply { message_id: String, text: String },
}

#[derive(Default)]
struct RecordingChannel {
    history: Vec<HistoryMessage>,
    newer: Vec<HistoryMessage>,
    posted: Mutex<Vec<Posted>>,
    posted_signal: Notify,
}

impl RecordingChannel {
    fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    fn record(&self, posted: Posted) {
        self.posted.lock().unwrap().push(posted);
        self.posted_signal.notify_one();
    }
}

impl Messaging for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> mimicbot::Result<InboundStream> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn fetch_history(
        &self,
        _channel_id: &ChannelId,
        query: HistoryQuery,
    ) -> mimicbot::Result<Vec<HistoryMessage>> {
        let source = if query.after.is_some() {
            &self.newer
        } else {
            &self.history
        };
        let skip = source.len().saturating_sub(usize::from(query.limit));
        Ok(source.iter().skip(skip).cloned().collect())
    }

    async fn send(&self, channel_id: &ChannelId, text: &str) -> mimicbot::Result<()> {
        self.record(Posted::Message {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply(
        &self,
        _channel_id: &ChannelId,
        message_id: &MessageId,
        text: &str,
    ) -> mimicbot::Result<()> {
        self.record(Posted::Reply {
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Answers every request with the same text and keeps what it was asked.
struct CannedModel {
    answer: Option<String>,
    seen: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl CannedModel {
    fn answering(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for CannedModel {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, turns: &[ConversationTurn]) -> Result<Option<String>, LlmError> {
        self.seen.lock().unwrap().push(turns.to_vec());
        Ok(self.answer.clone())
    }
}

fn message(id: &str, author_id: &str, author_name: &str, content: &str, second: i64) -> HistoryMessage {
    HistoryMessage {
        id: id.into(),
        author_id: author_id.into(),
        author_name: author_name.into(),
        content: content.into(),
        timestamp: chrono::DateTime::from_timestamp(1_700_000_000 + second, 0).unwrap(),
        reply_to: None,
    }
}

fn in_general(message: HistoryMessage) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        channel_id: "general".into(),
        message,
    })
}

fn ready() -> InboundEvent {
    InboundEvent::Ready(BotIdentity {
        id: BOT_ID.into(),
        username: "mimic".into(),
    })
}

fn conversation() -> Vec<HistoryMessage> {
    let mut question = message("3", "200", "alice", "who's bringing snacks", 3);
    question.reply_to = Some("2".into());
    vec![
        message("1", BOT_ID, "mimic", "START", 1),
        message("2", "300", "bob", "movie night at mine", 2),
        question,
    ]
}

fn pipeline(channel: Arc<RecordingChannel>, model: Arc<dyn TextGenerator>) -> Pipeline {
    let deps = AgentDeps::new(channel, ResponseGenerator::new(model));
    Pipeline::new(deps, "START")
}

#[tokio::test(start_paused = true)]
async fn event_stream_drives_a_full_exchange() {
    let history = conversation();
    let channel = Arc::new(RecordingChannel {
        history: history.clone(),
        ..RecordingChannel::default()
    });
    let model = Arc::new(CannedModel::answering(Some("me i guess")));
    let pipeline = pipeline(channel.clone(), model.clone());

    let (events_tx, events_rx) = tokio::sync::mpsc::channel(8);
    let events: InboundStream = Box::pin(tokio_stream::wrappers::ReceiverStream::new(events_rx));
    let run = tokio::spawn(pipeline.run(events));

    for event in [
        ready(),
        in_general(history[0].clone()),
        in_general(history[1].clone()),
    ] {
        events_tx.send(event).await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(30), channel.posted_signal.notified())
        .await
        .expect("a reply should be posted");

    drop(events_tx);
    run.await.unwrap();

    assert_eq!(
        channel.posted(),
        vec![Posted::Message {
            channel_id: "general".into(),
            text: "me i guess".into(),
        }]
    );

    let seen = model.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let turns = &seen[0];
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[1], ConversationTurn::assistant("START"));
    assert_eq!(turns[2], ConversationTurn::user("bob: movie night at mine"));
    assert_eq!(
        turns[3],
        ConversationTurn::user(
            "alice: (in response to bob: \"movie night at mine\") who's bringing snacks"
        )
    );
}

#[tokio::test(start_paused = true)]
async fn busy_channel_gets_a_threaded_reply_with_placeholder_text() {
    let history = conversation();
    let channel = Arc::new(RecordingChannel {
        history: history.clone(),
        newer: vec![message("4", "300", "bob", "not me", 4)],
        ..RecordingChannel::default()
    });
    let mut pipeline = pipeline(channel.clone(), Arc::new(CannedModel::answering(None)));

    pipeline.handle_event(ready());
    pipeline.handle_event(in_general(history[0].clone()));
    let Some(Admission::Started(attempt)) = pipeline.handle_event(in_general(history[2].clone()))
    else {
        panic!("trigger should start an attempt");
    };
    attempt.await.unwrap();

    assert_eq!(
        channel.posted(),
        vec![Posted::Reply {
            message_id: "3".into(),
            text: "...".into(),
        }]
    );
    assert!(!pipeline.gate().is_locked());
}

// Real clock: the mock server does socket IO, which a paused clock would
// race against the client timeout.
#[tokio::test]
async fn provider_rate_limit_pauses_the_gate() {
    let server = MockServer::start_async().await;
    let completions = server
        .mock_async(|when, then| {
            when.method(POST).path("/openai/v1/chat/completions");
            then.status(429)
                .header("retry-after", "10")
                .json_body(json!({"error": {"message": "Rate limit reached"}}));
        })
        .await;

    let model = GroqModel::new(&LlmConfig {
        api_base: format!("{}/openai/v1", server.base_url()),
        api_key: "test-groq-key".into(),
        model: "llama-3.1-8b-instant".into(),
        request_timeout_secs: 30,
    })
    .unwrap();

    let history = conversation();
    let channel = Arc::new(RecordingChannel {
        history: history.clone(),
        ..RecordingChannel::default()
    });
    let mut pipeline = pipeline(channel.clone(), Arc::new(model));

    pipeline.handle_event(ready());
    pipeline.handle_event(in_general(history[0].clone()));
    let Some(Admission::Started(attempt)) = pipeline.handle_event(in_general(history[2].clone()))
    else {
        panic!("trigger should start an attempt");
    };
    attempt.await.unwrap();

    completions.assert_async().await;
    assert!(channel.posted().is_empty());
    assert!(!pipeline.gate().is_locked());
    assert!(pipeline.gate().rate_limited_until().is_some());

    let next = pipeline.handle_event(in_general(message("5", "200", "alice", "hello??", 5)));
    assert!(matches!(
        next,
        Some(Admission::Rejected(mimicbot::agent::Rejection::RateLimited { remaining }))
            if remaining > Duration::from_secs(9)
    ));
}
