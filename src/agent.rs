//! The auto-responder: admission, generation attempts, delivery.

pub mod activation;
pub mod delivery;
pub mod failure;
pub mod gate;
pub mod pipeline;

pub use activation::ActivationRegistry;
pub use delivery::DeliveryMode;
pub use gate::{GateGuard, GenerationGate, Rejection};
pub use pipeline::{Admission, Pipeline};

use crate::llm::ResponseGenerator;
use crate::messaging::MessagingDyn;
use std::sync::Arc;

/// Shared dependency bundle for generation attempts.
#[derive(Clone)]
pub struct AgentDeps {
    pub messaging: Arc<dyn MessagingDyn>,
    pub generator: ResponseGenerator,
    pub gate: Arc<GenerationGate>,
}

impl AgentDeps {
    pub fn new(messaging: Arc<dyn MessagingDyn>, generator: ResponseGenerator) -> Self {
        Self {
            messaging,
            generator,
            gate: GenerationGate::new(),
        }
    }
}
