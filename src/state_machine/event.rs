//! Events that can occur in a session

use crate::state_machine::state::{InteractionMode, ReplyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw input delivered by the input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserAction {
    SubmitText { text: String },
    Confirm { answer: bool },
    SelectOption { option: String },
    AttachFile { name: String },
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::SubmitText { .. } => "submit_text",
            UserAction::Confirm { .. } => "confirm",
            UserAction::SelectOption { .. } => "select_option",
            UserAction::AttachFile { .. } => "attach_file",
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    SubmitText {
        text: String,
        /// Id the reply will carry if the submission is accepted
        reply_id: ReplyId,
    },
    Confirm {
        answer: bool,
    },
    SelectOption {
        option: String,
    },
    AttachFile {
        name: String,
    },

    // Timer events
    /// The simulated backend answered a pending submission
    ReplyDue {
        reply_id: ReplyId,
        content: String,
        next_mode: InteractionMode,
    },
}

impl Event {
    /// Short name used in logs and rejection messages
    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitText { .. } => "submit_text",
            Event::Confirm { .. } => "confirm",
            Event::SelectOption { .. } => "select_option",
            Event::AttachFile { .. } => "attach_file",
            Event::ReplyDue { .. } => "reply_due",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<UserAction> for Event {
    fn from(action: UserAction) -> Self {
        match action {
            UserAction::SubmitText { text } => Event::SubmitText {
                text,
                reply_id: ReplyId::new(),
            },
            UserAction::Confirm { answer } => Event::Confirm { answer },
            UserAction::SelectOption { option } => Event::SelectOption { option },
            UserAction::AttachFile { name } => Event::AttachFile { name },
        }
    }
}
