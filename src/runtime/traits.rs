//! Trait abstractions for runtime I/O
//!
//! These traits let tests replace randomness, timers and the simulated
//! backend with deterministic implementations.

use crate::state_machine::transition::default_reply;
use crate::state_machine::ReplyId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Source of uniform values in `[0, 1)` for mode selection
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

/// Starts the simulated-reply timer
pub trait Scheduler: Send + Sync {
    /// Deliver `reply_id` on `fire_tx` after `delay`, unless the returned
    /// token is cancelled first
    fn schedule(
        &self,
        reply_id: ReplyId,
        delay: Duration,
        fire_tx: mpsc::Sender<ReplyId>,
    ) -> CancellationToken;
}

/// Produces the text of a simulated reply
pub trait Responder: Send + Sync {
    fn reply(&self, prompt: &str) -> String;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn schedule(
        &self,
        reply_id: ReplyId,
        delay: Duration,
        fire_tx: mpsc::Sender<ReplyId>,
    ) -> CancellationToken {
        (**self).schedule(reply_id, delay, fire_tx)
    }
}

impl<T: Responder + ?Sized> Responder for Arc<T> {
    fn reply(&self, prompt: &str) -> String {
        (**self).reply(prompt)
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// `rand`'s standard generator, optionally seeded for reproducible sessions
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Wall-clock timer on the tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        reply_id: ReplyId,
        delay: Duration,
        fire_tx: mpsc::Sender<ReplyId>,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::debug!(%reply_id, "Reply timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if fire_tx.send(reply_id).await.is_err() {
                        tracing::debug!(%reply_id, "Reply timer fired after session closed");
                    }
                }
            }
        });
        token
    }
}

/// Stand-in for a real backend: echoes the submitted text
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedBackend;

impl Responder for SimulatedBackend {
    fn reply(&self, prompt: &str) -> String {
        default_reply(prompt)
    }
}
