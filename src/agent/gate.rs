//! Process-wide admission control for generation attempts.
//!
//! At most one attempt runs at a time, and none may start while a
//! rate-limit cooldown is pending. Admission hands out a [`GateGuard`];
//! dropping the guard reopens the gate, whichever way the attempt ended.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Longest cooldown the gate will hold, roughly thirty years.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Default)]
struct GateState {
    locked: bool,
    /// `None` means no cooldown has ever been applied.
    rate_limit_until: Option<Instant>,
}

/// Why the gate refused an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another attempt is in flight.
    Busy,
    /// A cooldown is pending for this much longer.
    RateLimited { remaining: Duration },
}

/// Mutual exclusion plus rate-limit deadline, checked and set in one step.
#[derive(Debug, Default)]
pub struct GenerationGate {
    state: Mutex<GateState>,
}

impl GenerationGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Admit one attempt, or say why not.
    ///
    /// The cooldown check, the lock check and taking the lock happen under a
    /// single acquisition of the state mutex. A rejection changes nothing.
    pub fn try_enter(self: &Arc<Self>) -> Result<GateGuard, Rejection> {
        let mut state = self.lock_state();

        if let Some(until) = state.rate_limit_until {
            let now = Instant::now();
            if now < until {
                return Err(Rejection::RateLimited {
                    remaining: until - now,
                });
            }
        }

        if state.locked {
            return Err(Rejection::Busy);
        }

        state.locked = true;
        Ok(GateGuard {
            gate: Arc::clone(self),
        })
    }

    /// Release the lock. Idempotent.
    pub fn exit(&self) {
        self.lock_state().locked = false;
    }

    /// Refuse admissions until `duration` from now.
    ///
    /// Durations past what the clock can represent saturate at [`FAR_FUTURE`].
    pub fn apply_rate_limit(&self, duration: Duration) {
        let now = Instant::now();
        let until = now
            .checked_add(duration.min(FAR_FUTURE))
            .unwrap_or(now);
        self.lock_state().rate_limit_until = Some(until);
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state().locked
    }

    pub fn rate_limited_until(&self) -> Option<Instant> {
        self.lock_state().rate_limit_until
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        // The state is two plain fields; a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of admission. Reopens the gate on drop.
#[must_use = "dropping the guard immediately reopens the gate"]
#[derive(Debug)]
pub struct GateGuard {
    gate: Arc<GenerationGate>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.exit();
    }
}
