//! Generation service client and the reply generation step.

pub mod generator;
pub mod model;

pub use generator::ResponseGenerator;
pub use model::GroqModel;

use crate::conversation::ConversationTurn;
use crate::error::LlmError;

/// A chat-completion backend.
///
/// Returns `Ok(None)` when the service answered without any content.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync + 'static {
    /// Model identifier sent with every request.
    fn model_name(&self) -> &str;

    async fn generate(&self, turns: &[ConversationTurn]) -> Result<Option<String>, LlmError>;
}
