//! Effects produced by state transitions

use crate::state_machine::state::{ChatEntry, LogLine, ReplyId};
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript
    AppendEntry(ChatEntry),

    /// Append a line to the activity log
    AppendLog(LogLine),

    /// Empty the text input box
    ClearInput,

    /// Start the simulated-reply timer for a submission
    ScheduleReply {
        reply_id: ReplyId,
        delay: Duration,
        prompt: String,
    },

    /// Push a fresh frame to the render sink
    NotifyRender,
}

impl Effect {
    pub fn user_entry(content: impl Into<String>) -> Self {
        Effect::AppendEntry(ChatEntry::user(content))
    }

    pub fn system_entry(content: impl Into<String>) -> Self {
        Effect::AppendEntry(ChatEntry::system(content))
    }

    pub fn log(step: u64, text: impl Into<String>) -> Self {
        Effect::AppendLog(LogLine::new(step, text))
    }
}
