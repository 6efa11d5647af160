//! Session runtime executor

use super::traits::{RandomSource, Responder, Scheduler};
use super::{Frame, RenderEvent};

use crate::policy::ModePolicy;
use crate::state_machine::{
    transition, Effect, Event, ReplyId, SessionContext, SessionState, TransitionError, UserAction,
};
use crate::store::TranscriptStore;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Generic session runtime that can work with any random source, timer and
/// reply generator
pub struct SessionRuntime<R, S, B>
where
    R: RandomSource,
    S: Scheduler,
    B: Responder,
{
    context: SessionContext,
    state: SessionState,
    store: Arc<TranscriptStore>,
    policy: ModePolicy,
    rng: R,
    scheduler: S,
    responder: B,
    action_rx: mpsc::Receiver<UserAction>,
    /// Fired reply timers come back on this channel
    timer_tx: mpsc::Sender<ReplyId>,
    timer_rx: mpsc::Receiver<ReplyId>,
    broadcast_tx: broadcast::Sender<RenderEvent>,
    /// Token to cancel the in-flight reply timer
    reply_cancel_token: Option<CancellationToken>,
    shutdown: CancellationToken,
}

impl<R, S, B> SessionRuntime<R, S, B>
where
    R: RandomSource,
    S: Scheduler,
    B: Responder,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        store: Arc<TranscriptStore>,
        policy: ModePolicy,
        rng: R,
        scheduler: S,
        responder: B,
        action_rx: mpsc::Receiver<UserAction>,
        broadcast_tx: broadcast::Sender<RenderEvent>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::channel(4);
        Self {
            context,
            state: SessionState::default(),
            store,
            policy,
            rng,
            scheduler,
            responder,
            action_rx,
            timer_tx,
            timer_rx,
            broadcast_tx,
            reply_cancel_token: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the event loop when this token is cancelled
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &Arc<TranscriptStore> {
        &self.store
    }

    /// Current render frame
    pub fn frame(&self) -> Frame {
        Frame {
            transcript: self.store.snapshot(),
            mode: self.state.mode.clone(),
            step: self.state.step,
            awaiting_reply: self.state.is_awaiting_reply(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        // One event at a time, each processed to completion
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                action = self.action_rx.recv() => match action {
                    Some(action) => {
                        let _ = self.dispatch(action);
                    }
                    None => break,
                },
                Some(reply_id) = self.timer_rx.recv() => {
                    let _ = self.fire_reply(reply_id);
                }
            }
        }

        self.teardown();
        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    /// Handle one user action
    pub fn dispatch(&mut self, action: UserAction) -> Result<(), TransitionError> {
        tracing::debug!(action = action.name(), mode = %self.state.mode, "Handling user action");
        self.process_event(Event::from(action))
    }

    /// Resolve the pending reply whose timer just fired
    pub fn fire_reply(&mut self, reply_id: ReplyId) -> Result<(), TransitionError> {
        let Some(pending) = self.state.pending.as_ref().filter(|p| p.id == reply_id) else {
            tracing::warn!(%reply_id, "Ignoring timer for a reply that is no longer pending");
            return Err(TransitionError::InvalidModeAction {
                action: "reply_due",
                mode: self.state.mode.name(),
            });
        };

        let content = self.responder.reply(&pending.prompt);
        let next_mode = self.policy.select(&mut self.rng);
        self.reply_cancel_token = None;

        tracing::info!(%reply_id, next_mode = %next_mode, "Simulated reply received");
        self.process_event(Event::ReplyDue {
            reply_id,
            content,
            next_mode,
        })
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let event_name = event.name();

        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                if e.is_silent() {
                    tracing::debug!(event = event_name, "Ignoring empty submission");
                } else {
                    tracing::warn!(event = event_name, error = %e, "Rejected action");
                }
                let _ = self.broadcast_tx.send(RenderEvent::Rejected {
                    reason: e.to_string(),
                    silent: e.is_silent(),
                });
                return Err(e);
            }
        };

        self.state = result.new_state;
        self.execute_effects(result.effects);
        Ok(())
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        let mut entries = Vec::new();
        let mut lines = Vec::new();
        let mut notify = false;

        for effect in effects {
            match effect {
                Effect::AppendEntry(entry) => entries.push(entry),
                Effect::AppendLog(line) => lines.push(line),
                Effect::ClearInput => {
                    let _ = self.broadcast_tx.send(RenderEvent::ClearInput);
                }
                Effect::ScheduleReply {
                    reply_id,
                    delay,
                    prompt,
                } => {
                    tracing::info!(
                        %reply_id,
                        delay_ms = %delay.as_millis(),
                        prompt_len = prompt.len(),
                        "Scheduling simulated reply"
                    );
                    let token = self
                        .scheduler
                        .schedule(reply_id, delay, self.timer_tx.clone());
                    if let Some(previous) = self.reply_cancel_token.replace(token) {
                        previous.cancel();
                    }
                }
                Effect::NotifyRender => notify = true,
            }
        }

        // The whole turn lands at once
        if !entries.is_empty() || !lines.is_empty() {
            if let Some(line) = lines.last() {
                tracing::info!(step = line.step, "{line}");
            }
            self.store.commit(entries, lines);
        }

        if notify {
            let _ = self.broadcast_tx.send(RenderEvent::Frame(self.frame()));
        }
    }

    /// Release the reply timer so it cannot fire into a closed session
    fn teardown(&mut self) {
        if let Some(token) = self.reply_cancel_token.take() {
            tracing::debug!("Cancelling pending reply timer");
            token.cancel();
        }
        self.timer_rx.close();
    }
}

impl<R, S, B> Drop for SessionRuntime<R, S, B>
where
    R: RandomSource,
    S: Scheduler,
    B: Responder,
{
    fn drop(&mut self) {
        if let Some(token) = self.reply_cancel_token.take() {
            token.cancel();
        }
    }
}
