//! Runtime for executing a chat session
//!
//! Owns the session's event loop: user actions and reply timers come in,
//! render frames go out.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::config::SessionConfig;
use crate::state_machine::{InteractionMode, SessionContext, UserAction};
use crate::store::{Snapshot, TranscriptStore};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything the render sink needs to redraw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub transcript: Snapshot,
    pub mode: InteractionMode,
    pub step: u64,
    pub awaiting_reply: bool,
}

/// Events sent to the render sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    /// Transcript, log or mode changed
    Frame(Frame),
    /// An accepted submission should empty the input box
    ClearInput,
    /// An action was refused; nothing changed
    Rejected { reason: String, silent: bool },
}

#[derive(Debug, Error)]
#[error("Session runtime has stopped")]
pub struct SessionClosed;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: String,
    action_tx: mpsc::Sender<UserAction>,
    broadcast_tx: broadcast::Sender<RenderEvent>,
    store: Arc<TranscriptStore>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    /// Deliver an action from the input source
    pub async fn send(&self, action: UserAction) -> Result<(), SessionClosed> {
        self.action_tx.send(action).await.map_err(|_| SessionClosed)
    }

    /// Subscribe to render events
    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Current transcript and log
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Tear the session down. A pending reply is cancelled and never lands.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Start a session with production adapters on the current tokio runtime
pub fn start_session(config: &SessionConfig) -> (SessionHandle, JoinHandle<()>) {
    let rng = config
        .seed
        .map_or_else(StdRandom::from_entropy, StdRandom::seeded);
    spawn_runtime(config, rng, TokioScheduler, SimulatedBackend)
}

/// Start a session with the given adapters
pub fn spawn_runtime<R, S, B>(
    config: &SessionConfig,
    rng: R,
    scheduler: S,
    responder: B,
) -> (SessionHandle, JoinHandle<()>)
where
    R: RandomSource + 'static,
    S: Scheduler + 'static,
    B: Responder + 'static,
{
    let session_id = uuid::Uuid::new_v4().to_string();
    let context = SessionContext::new(&session_id, config.reply_delay);
    let store = Arc::new(TranscriptStore::new());
    let (action_tx, action_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let shutdown = CancellationToken::new();

    let runtime = SessionRuntime::new(
        context,
        Arc::clone(&store),
        config.policy.clone(),
        rng,
        scheduler,
        responder,
        action_rx,
        broadcast_tx.clone(),
    )
    .with_shutdown(shutdown.clone());

    let task = tokio::spawn(runtime.run());

    let handle = SessionHandle {
        session_id,
        action_tx,
        broadcast_tx,
        store,
        shutdown,
    };
    (handle, task)
}
