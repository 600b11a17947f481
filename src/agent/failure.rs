//! Classify a failed attempt and update the gate accordingly.

use crate::agent::gate::GenerationGate;
use crate::error::Error;
use std::time::Duration;

/// Cooldown applied when a rate-limit signal carries no retry-after hint.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited { cooldown: Duration },
    Other,
}

pub fn classify(error: &Error) -> FailureKind {
    match error.rate_limit() {
        Some(signal) => FailureKind::RateLimited {
            cooldown: signal.retry_after.unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN),
        },
        None => FailureKind::Other,
    }
}

/// Record a failure. Rate limits push the gate's deadline out; nothing else
/// changes state. Never re-raises.
pub fn absorb(gate: &GenerationGate, error: &Error) -> FailureKind {
    let kind = classify(error);

    match kind {
        FailureKind::RateLimited { cooldown } => {
            gate.apply_rate_limit(cooldown);
            tracing::warn!(
                event = "rate_limited",
                cooldown_secs = cooldown.as_secs_f64(),
                "pausing generation after rate limit"
            );
        }
        FailureKind::Other => {
            tracing::error!(event = "generation_failed", %error, "generation attempt failed");
        }
    }

    kind
}
