//! Mock implementations for testing
//!
//! These mocks make randomness and timers fully deterministic.

use super::traits::*;
use super::{RenderEvent, SessionRuntime};
use crate::policy::ModePolicy;
use crate::state_machine::{ReplyId, SessionContext, UserAction};
use crate::store::TranscriptStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted Random Source
// ============================================================================

/// Random source that replays a fixed list of values.
///
/// Once the script runs out it keeps returning a value just below 1, which
/// the mode policy always maps to free text.
pub struct ScriptedRandom {
    values: VecDeque<f64>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.values.pop_front().unwrap_or(0.999)
    }
}

// ============================================================================
// Manual Scheduler
// ============================================================================

struct ScheduledReply {
    reply_id: ReplyId,
    delay: Duration,
    fire_tx: mpsc::Sender<ReplyId>,
    token: CancellationToken,
}

/// Scheduler that never fires on its own; tests fire replies explicitly
#[derive(Default)]
pub struct ManualScheduler {
    scheduled: Mutex<Vec<ScheduledReply>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids and delays of every reply scheduled so far
    pub fn scheduled(&self) -> Vec<(ReplyId, Duration)> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.reply_id, s.delay))
            .collect()
    }

    pub fn last_reply_id(&self) -> Option<ReplyId> {
        self.scheduled.lock().unwrap().last().map(|s| s.reply_id)
    }

    pub fn is_cancelled(&self, reply_id: ReplyId) -> bool {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.reply_id == reply_id && s.token.is_cancelled())
    }

    /// Deliver a timer firing the way the tokio scheduler would.
    /// Returns false if the timer was cancelled or the session is gone.
    pub fn fire(&self, reply_id: ReplyId) -> bool {
        let scheduled = self.scheduled.lock().unwrap();
        scheduled
            .iter()
            .find(|s| s.reply_id == reply_id && !s.token.is_cancelled())
            .is_some_and(|s| s.fire_tx.try_send(reply_id).is_ok())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(
        &self,
        reply_id: ReplyId,
        delay: Duration,
        fire_tx: mpsc::Sender<ReplyId>,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        self.scheduled.lock().unwrap().push(ScheduledReply {
            reply_id,
            delay,
            fire_tx,
            token: token.clone(),
        });
        token
    }
}

// ============================================================================
// Fixed Responder
// ============================================================================

/// Responder that always answers with the same text
pub struct FixedResponder(pub String);

impl Responder for FixedResponder {
    fn reply(&self, _prompt: &str) -> String {
        self.0.clone()
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// A runtime driven directly by the test, without its event loop
pub struct TestRuntime {
    pub runtime: SessionRuntime<ScriptedRandom, Arc<ManualScheduler>, SimulatedBackend>,
    pub scheduler: Arc<ManualScheduler>,
    pub broadcast_rx: broadcast::Receiver<RenderEvent>,
    _action_tx: mpsc::Sender<UserAction>,
}

impl TestRuntime {
    /// Create a test runtime with the given random script
    pub fn new(random: impl IntoIterator<Item = f64>) -> Self {
        Self::with_policy(random, ModePolicy::default())
    }

    pub fn with_policy(random: impl IntoIterator<Item = f64>, policy: ModePolicy) -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let (action_tx, action_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let runtime = SessionRuntime::new(
            SessionContext::new("test-session", Duration::from_millis(1000)),
            Arc::new(TranscriptStore::new()),
            policy,
            ScriptedRandom::new(random),
            Arc::clone(&scheduler),
            SimulatedBackend,
            action_rx,
            broadcast_tx,
        );

        Self {
            runtime,
            scheduler,
            broadcast_rx,
            _action_tx: action_tx,
        }
    }

    pub fn submit(&mut self, text: &str) -> Result<(), crate::state_machine::TransitionError> {
        self.runtime.dispatch(UserAction::SubmitText {
            text: text.to_string(),
        })
    }

    /// Fire the most recently scheduled reply timer
    pub fn resolve_reply(&mut self) -> Result<(), crate::state_machine::TransitionError> {
        let reply_id = self
            .scheduler
            .last_reply_id()
            .expect("no reply was scheduled");
        self.runtime.fire_reply(reply_id)
    }

    /// Drain render events received so far
    pub fn render_events(&mut self) -> Vec<RenderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.broadcast_rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::runtime::{spawn_runtime, Frame};
    use crate::state_machine::{
        ChatEntry, InteractionMode, LogLine, OptionSet, TransitionError,
    };

    fn select_ab() -> ModePolicy {
        ModePolicy::new(1.0, OptionSet::new(["A", "B"]).unwrap())
    }

    #[test]
    fn test_hello_scenario() {
        // 0.1 < 0.3: structured; 0.2 < 0.5: confirmation
        let mut rt = TestRuntime::new([0.1, 0.2]);

        rt.submit("hello").unwrap();
        let snap = rt.runtime.store().snapshot();
        assert_eq!(snap.entries, vec![ChatEntry::user("hello")]);
        assert!(snap.log.is_empty());
        assert!(rt.runtime.state().is_awaiting_reply());

        rt.resolve_reply().unwrap();
        let snap = rt.runtime.store().snapshot();
        assert_eq!(
            snap.entries,
            vec![
                ChatEntry::user("hello"),
                ChatEntry::system("Backend reply to: \"hello\"")
            ]
        );
        assert_eq!(
            snap.log,
            vec![LogLine::new(1, "Message sent and reply received")]
        );
        assert_eq!(rt.runtime.state().step, 2);
        assert_eq!(rt.runtime.state().mode, InteractionMode::Confirmation);
        assert!(!rt.runtime.state().is_awaiting_reply());
    }

    #[test]
    fn test_reply_uses_configured_delay() {
        let mut rt = TestRuntime::new([]);
        rt.submit("hello").unwrap();
        let scheduled = rt.scheduler.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].1, Duration::from_millis(1000));
    }

    #[test]
    fn test_confirm_scenario() {
        let mut rt = TestRuntime::new([0.0, 0.0]);
        rt.submit("hello").unwrap();
        rt.resolve_reply().unwrap();
        assert_eq!(rt.runtime.state().mode, InteractionMode::Confirmation);

        rt.runtime
            .dispatch(UserAction::Confirm { answer: true })
            .unwrap();
        let snap = rt.runtime.store().snapshot();
        assert_eq!(snap.entries.last(), Some(&ChatEntry::user("Yes")));
        assert_eq!(snap.log.last(), Some(&LogLine::new(2, "Answer \"Yes\" sent")));
        assert_eq!(rt.runtime.state().mode, InteractionMode::FreeText);
        assert_eq!(rt.runtime.state().step, 3);
    }

    #[test]
    fn test_invalid_option_leaves_everything_unchanged() {
        let mut rt = TestRuntime::with_policy([0.0, 0.9], select_ab());
        rt.submit("pick one").unwrap();
        rt.resolve_reply().unwrap();
        let before = rt.runtime.frame();
        rt.render_events();

        let result = rt.runtime.dispatch(UserAction::SelectOption {
            option: "C".to_string(),
        });
        assert_eq!(
            result.unwrap_err(),
            TransitionError::InvalidOptionChoice {
                option: "C".to_string()
            }
        );
        assert_eq!(rt.runtime.frame(), before);
        assert!(matches!(
            rt.render_events().as_slice(),
            [RenderEvent::Rejected { silent: false, .. }]
        ));

        rt.runtime
            .dispatch(UserAction::SelectOption {
                option: "A".to_string(),
            })
            .unwrap();
        let snap = rt.runtime.store().snapshot();
        assert_eq!(snap.entries.last(), Some(&ChatEntry::user("Selected option: A")));
        assert_eq!(rt.runtime.state().mode, InteractionMode::FreeText);
    }

    #[test]
    fn test_second_submission_rejected_while_pending() {
        let mut rt = TestRuntime::new([]);
        rt.submit("first").unwrap();
        assert_eq!(
            rt.submit("second").unwrap_err(),
            TransitionError::ConcurrentSubmission
        );
        assert_eq!(rt.scheduler.scheduled().len(), 1);

        rt.resolve_reply().unwrap();
        let snap = rt.runtime.store().snapshot();
        assert_eq!(
            snap.entries,
            vec![
                ChatEntry::user("first"),
                ChatEntry::system("Backend reply to: \"first\"")
            ]
        );

        // Resolving the same reply twice does nothing
        let first_id = rt.scheduler.scheduled()[0].0;
        assert!(rt.runtime.fire_reply(first_id).is_err());
        assert_eq!(rt.runtime.store().entry_count(), 2);
    }

    #[test]
    fn test_attach_during_pending_reply() {
        let mut rt = TestRuntime::new([]);
        rt.submit("hello").unwrap();
        rt.runtime
            .dispatch(UserAction::AttachFile {
                name: "report.pdf".to_string(),
            })
            .unwrap();
        assert_eq!(rt.runtime.state().mode, InteractionMode::FreeText);
        rt.resolve_reply().unwrap();

        let snap = rt.runtime.store().snapshot();
        assert_eq!(
            snap.entries,
            vec![
                ChatEntry::user("hello"),
                ChatEntry::user("File sent: report.pdf"),
                ChatEntry::system("Backend reply to: \"hello\""),
            ]
        );
        assert_eq!(
            snap.log,
            vec![
                LogLine::new(1, "File \"report.pdf\" sent"),
                // Logged under the step "hello" was appended at
                LogLine::new(1, "Message sent and reply received"),
            ]
        );
        assert_eq!(rt.runtime.state().step, 3);
    }

    #[test]
    fn test_whitespace_submission_is_silent() {
        let mut rt = TestRuntime::new([]);
        assert_eq!(
            rt.submit("   ").unwrap_err(),
            TransitionError::EmptySubmission
        );
        assert!(rt.scheduler.scheduled().is_empty());
        assert_eq!(rt.runtime.store().entry_count(), 0);
        assert_eq!(rt.runtime.state().step, 1);
        assert!(matches!(
            rt.render_events().as_slice(),
            [RenderEvent::Rejected { silent: true, .. }]
        ));
    }

    #[test]
    fn test_render_events_for_submission() {
        let mut rt = TestRuntime::new([]);
        rt.submit("hello").unwrap();

        let events = rt.render_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RenderEvent::ClearInput);
        match &events[1] {
            RenderEvent::Frame(Frame {
                transcript,
                awaiting_reply,
                step,
                ..
            }) => {
                assert_eq!(transcript.entries, vec![ChatEntry::user("hello")]);
                assert!(*awaiting_reply);
                assert_eq!(*step, 1);
            }
            other => panic!("Expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let mut rt = TestRuntime::new([]);
        rt.submit("hello").unwrap();
        let reply_id = rt.scheduler.last_reply_id().unwrap();
        let scheduler = Arc::clone(&rt.scheduler);

        drop(rt);
        assert!(scheduler.is_cancelled(reply_id));
        assert!(!scheduler.fire(reply_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_arrives_after_delay() {
        let config = SessionConfig::default();
        let (handle, _task) = spawn_runtime(
            &config,
            ScriptedRandom::new([0.9]),
            TokioScheduler,
            FixedResponder("pong".to_string()),
        );
        let mut rx = handle.subscribe();

        handle
            .send(UserAction::SubmitText {
                text: "ping".to_string(),
            })
            .await
            .unwrap();

        // Submission is visible right away
        assert_eq!(rx.recv().await.unwrap(), RenderEvent::ClearInput);
        assert!(matches!(rx.recv().await.unwrap(), RenderEvent::Frame(f) if f.awaiting_reply));
        assert_eq!(handle.snapshot().entries, vec![ChatEntry::user("ping")]);

        tokio::time::advance(Duration::from_millis(1000)).await;
        match rx.recv().await.unwrap() {
            RenderEvent::Frame(frame) => {
                assert_eq!(
                    frame.transcript.entries,
                    vec![ChatEntry::user("ping"), ChatEntry::system("pong")]
                );
                assert_eq!(frame.transcript.log, vec![LogLine::new(1, "Message sent and reply received")]);
                assert_eq!(frame.step, 2);
                assert_eq!(frame.mode, InteractionMode::FreeText);
                assert!(!frame.awaiting_reply);
            }
            other => panic!("Expected frame, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_reply() {
        let config = SessionConfig::default();
        let (handle, task) = spawn_runtime(
            &config,
            ScriptedRandom::new([]),
            TokioScheduler,
            SimulatedBackend,
        );
        let mut rx = handle.subscribe();

        handle
            .send(UserAction::SubmitText {
                text: "hello".to_string(),
            })
            .await
            .unwrap();
        // Wait until the submission has been processed
        assert_eq!(rx.recv().await.unwrap(), RenderEvent::ClearInput);

        handle.shutdown();
        task.await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot().entries, vec![ChatEntry::user("hello")]);
        assert!(handle
            .send(UserAction::SubmitText {
                text: "again".to_string()
            })
            .await
            .is_err());
    }
}
