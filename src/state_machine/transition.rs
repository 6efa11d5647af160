//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result. Timers, storage and rendering happen in the runtime.

use super::state::{InteractionMode, PendingReply};
use super::{Effect, Event, SessionContext, SessionState};
use thiserror::Error;

pub const AFFIRM_LABEL: &str = "Yes";
pub const DENY_LABEL: &str = "No";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition.
///
/// Every variant leaves state, transcript and step counter untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Submission is empty")]
    EmptySubmission,
    #[error("Action {action} is not valid in mode {mode}")]
    InvalidModeAction {
        action: &'static str,
        mode: &'static str,
    },
    #[error("{option:?} is not one of the offered options")]
    InvalidOptionChoice { option: String },
    #[error("A reply is still pending, wait for it before sending another message")]
    ConcurrentSubmission,
}

impl TransitionError {
    /// Rejections the user did nothing visibly wrong to cause
    pub fn is_silent(&self) -> bool {
        matches!(self, TransitionError::EmptySubmission)
    }

    fn invalid(state: &SessionState, event: &Event) -> Self {
        TransitionError::InvalidModeAction {
            action: event.name(),
            mode: state.mode.name(),
        }
    }
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.mode, event) {
        // ============================================================
        // Free text
        // ============================================================
        (InteractionMode::FreeText, Event::SubmitText { text, reply_id }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptySubmission);
            }
            if state.pending.is_some() {
                return Err(TransitionError::ConcurrentSubmission);
            }

            let new_state = SessionState {
                pending: Some(PendingReply {
                    id: reply_id,
                    prompt: text.clone(),
                    step: state.step,
                }),
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::user_entry(text.clone()))
                .with_effect(Effect::ClearInput)
                .with_effect(Effect::ScheduleReply {
                    reply_id,
                    delay: context.reply_delay,
                    prompt: text,
                })
                .with_effect(Effect::NotifyRender))
        }

        // ============================================================
        // Simulated reply
        // ============================================================
        (
            _,
            Event::ReplyDue {
                reply_id,
                content,
                next_mode,
            },
        ) => {
            let Some(pending) = state.pending.as_ref().filter(|p| p.id == reply_id) else {
                return Err(TransitionError::InvalidModeAction {
                    action: "reply_due",
                    mode: state.mode.name(),
                });
            };

            let content = if content.trim().is_empty() {
                default_reply(&pending.prompt)
            } else {
                content
            };

            Ok(TransitionResult::new(SessionState {
                mode: next_mode,
                step: state.step + 1,
                pending: None,
            })
            .with_effect(Effect::system_entry(content))
            .with_effect(Effect::log(pending.step, "Message sent and reply received"))
            .with_effect(Effect::NotifyRender))
        }

        // ============================================================
        // Structured prompts
        // ============================================================
        (InteractionMode::Confirmation, Event::Confirm { answer }) => {
            let label = if answer { AFFIRM_LABEL } else { DENY_LABEL };
            let step = state.step;
            Ok(TransitionResult::new(SessionState {
                mode: InteractionMode::FreeText,
                step: step + 1,
                pending: state.pending.clone(),
            })
            .with_effect(Effect::user_entry(label))
            .with_effect(Effect::log(step, format!("Answer \"{label}\" sent")))
            .with_effect(Effect::NotifyRender))
        }

        (InteractionMode::SingleSelect { options }, Event::SelectOption { option }) => {
            if !options.contains(&option) {
                return Err(TransitionError::InvalidOptionChoice { option });
            }
            let step = state.step;
            Ok(TransitionResult::new(SessionState {
                mode: InteractionMode::FreeText,
                step: step + 1,
                pending: state.pending.clone(),
            })
            .with_effect(Effect::user_entry(format!("Selected option: {option}")))
            .with_effect(Effect::log(step, format!("Option \"{option}\" selected")))
            .with_effect(Effect::NotifyRender))
        }

        // ============================================================
        // Attachments (any mode, mode unchanged)
        // ============================================================
        (_, Event::AttachFile { name }) => {
            if name.trim().is_empty() {
                return Err(TransitionError::InvalidModeAction {
                    action: "attach_file",
                    mode: state.mode.name(),
                });
            }
            let step = state.step;
            Ok(TransitionResult::new(SessionState {
                step: step + 1,
                ..state.clone()
            })
            .with_effect(Effect::user_entry(format!("File sent: {name}")))
            .with_effect(Effect::log(step, format!("File \"{name}\" sent")))
            .with_effect(Effect::NotifyRender))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (_, event) => Err(TransitionError::invalid(state, &event)),
    }
}

/// Reply used when the backend produced nothing
pub fn default_reply(prompt: &str) -> String {
    format!("Backend reply to: \"{prompt}\"")
}
