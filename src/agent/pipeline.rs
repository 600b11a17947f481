//! Inbound event dispatch and the generation attempt it launches.
//!
//! Events are admitted one at a time, in arrival order, by [`Pipeline::on_message`].
//! Admission never suspends: the activation check, the channel check and the
//! gate check all complete before the next event is looked at. An admitted
//! attempt runs on its own task so later events keep flowing while it waits
//! on the network or on its typing delay.

use crate::agent::activation::{ActivationRegistry, is_activation_marker};
use crate::agent::delivery::{self, DeliveryMode};
use crate::agent::failure;
use crate::agent::gate::{GateGuard, GenerationGate, Rejection};
use crate::agent::AgentDeps;
use crate::conversation::build_context;
use crate::error::Result;
use crate::messaging::InboundStream;
use crate::{BotIdentity, InboundEvent, InboundMessage, UserId, prompts};

use futures::StreamExt as _;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument as _;

/// What happened to one inbound message.
#[derive(Debug)]
pub enum Admission {
    /// The transport has not reported who we are yet.
    NotReady,
    /// The message was the activation marker.
    Activated { newly_active: bool },
    /// The channel is not live.
    Inactive,
    /// We wrote it ourselves.
    OwnMessage,
    /// The gate refused.
    Rejected(Rejection),
    /// A generation attempt is running on this task.
    Started(JoinHandle<()>),
}

/// Session state for one bot process: who we are, where we're live, and the gate.
pub struct Pipeline {
    deps: AgentDeps,
    registry: ActivationRegistry,
    activation_keyword: String,
    identity: Option<BotIdentity>,
}

impl Pipeline {
    pub fn new(deps: AgentDeps, activation_keyword: impl Into<String>) -> Self {
        Self {
            deps,
            registry: ActivationRegistry::new(),
            activation_keyword: activation_keyword.into(),
            identity: None,
        }
    }

    pub fn registry(&self) -> &ActivationRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &Arc<GenerationGate> {
        &self.deps.gate
    }

    /// Consume events until the transport closes the stream.
    pub async fn run(mut self, mut events: InboundStream) {
        while let Some(event) = events.next().await {
            self.handle_event(event);
        }
        tracing::info!("inbound event stream ended");
    }

    pub fn handle_event(&mut self, event: InboundEvent) -> Option<Admission> {
        match event {
            InboundEvent::Ready(identity) => {
                self.on_ready(identity);
                None
            }
            InboundEvent::Message(message) => Some(self.on_message(message)),
        }
    }

    pub fn on_ready(&mut self, identity: BotIdentity) {
        tracing::info!(
            event = "bot_ready",
            user_id = %identity.id,
            model = %self.deps.generator.model_name(),
            "{} is ready",
            identity.username
        );
        self.identity = Some(identity);
    }

    pub fn on_message(&mut self, message: InboundMessage) -> Admission {
        let Some(identity) = &self.identity else {
            tracing::debug!(channel_id = %message.channel_id, "message before ready, ignoring");
            return Admission::NotReady;
        };

        let own_message = message.author_id() == &identity.id;

        if own_message && is_activation_marker(message.content(), &self.activation_keyword) {
            let newly_active = self.registry.activate(message.channel_id.clone());
            if newly_active {
                tracing::info!(
                    event = "channel_activated",
                    channel_id = %message.channel_id,
                    "channel activated"
                );
            } else {
                tracing::debug!(channel_id = %message.channel_id, "channel already active");
            }
            return Admission::Activated { newly_active };
        }

        if !self.registry.is_active(&message.channel_id) {
            return Admission::Inactive;
        }

        if own_message {
            return Admission::OwnMessage;
        }

        let guard = match self.deps.gate.try_enter() {
            Ok(guard) => guard,
            Err(rejection) => {
                match rejection {
                    Rejection::RateLimited { remaining } => tracing::info!(
                        event = "rate_limited",
                        channel_id = %message.channel_id,
                        remaining_secs = remaining.as_secs_f64(),
                        "waiting for rate limit"
                    ),
                    Rejection::Busy => tracing::debug!(
                        channel_id = %message.channel_id,
                        "generation already in flight, ignoring"
                    ),
                }
                return Admission::Rejected(rejection);
            }
        };

        let span = tracing::info_span!(
            "generation",
            channel_id = %message.channel_id,
            trigger_id = %message.id(),
        );
        let handle = tokio::spawn(
            run_attempt(self.deps.clone(), identity.id.clone(), message, guard).instrument(span),
        );

        Admission::Started(handle)
    }
}

/// One generation attempt. Failures are absorbed here; the guard reopens the
/// gate when this returns or unwinds.
async fn run_attempt(deps: AgentDeps, bot_id: UserId, trigger: InboundMessage, guard: GateGuard) {
    if let Err(error) = generate_and_deliver(&deps, &bot_id, &trigger).await {
        failure::absorb(&deps.gate, &error);
    }
    drop(guard);
}

async fn generate_and_deliver(
    deps: &AgentDeps,
    bot_id: &str,
    trigger: &InboundMessage,
) -> Result<DeliveryMode> {
    let messaging = deps.messaging.as_ref();

    let turns = build_context(messaging, trigger, bot_id, prompts::system_directive()).await?;
    let reply = deps
        .generator
        .respond(messaging, &trigger.channel_id, &turns)
        .await?;

    delivery::deliver(messaging, trigger, &reply).await
}
