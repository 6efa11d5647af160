//! Session state types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Transcript Types
// ============================================================================

/// Who wrote a chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    System,
}

/// One message in the transcript. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub author: Author,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            author: Author::System,
            content: content.into(),
        }
    }
}

/// One audit-log line, tagged with the step it completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub step: u64,
    pub text: String,
}

impl LogLine {
    pub fn new(step: u64, text: impl Into<String>) -> Self {
        Self {
            step,
            text: text.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.step, self.text)
    }
}

// ============================================================================
// Option Set - ordered, never empty
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionSetError {
    #[error("option set must contain at least one option")]
    Empty,
    #[error("option {0} is blank")]
    BlankOption(usize),
}

/// Choices offered by a single-select prompt, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    pub fn new<I, S>(options: I) -> Result<Self, OptionSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        if options.is_empty() {
            return Err(OptionSetError::Empty);
        }
        if let Some(idx) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(OptionSetError::BlankOption(idx));
        }
        Ok(Self(options))
    }

    pub fn contains(&self, option: &str) -> bool {
        self.0.iter().any(|o| o == option)
    }

    /// 1-based lookup, as shown to the user
    pub fn nth(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for OptionSet {
    fn default() -> Self {
        Self(vec![
            "Option 1".to_string(),
            "Option 2".to_string(),
            "Option 3".to_string(),
        ])
    }
}

impl TryFrom<Vec<String>> for OptionSet {
    type Error = OptionSetError;

    fn try_from(options: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(options)
    }
}

impl From<OptionSet> for Vec<String> {
    fn from(set: OptionSet) -> Self {
        set.0
    }
}

// ============================================================================
// Interaction Mode
// ============================================================================

/// What kind of input the interface solicits next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionMode {
    /// Unconstrained text input
    #[default]
    FreeText,
    /// Yes/no answer
    Confirmation,
    /// Pick exactly one of the offered options
    SingleSelect { options: OptionSet },
}

impl InteractionMode {
    pub fn is_structured(&self) -> bool {
        !matches!(self, InteractionMode::FreeText)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::FreeText => "free_text",
            InteractionMode::Confirmation => "confirmation",
            InteractionMode::SingleSelect { .. } => "single_select",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Identifies one scheduled simulated reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyId(Uuid);

impl ReplyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReplyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A text submission whose simulated reply has not arrived yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReply {
    pub id: ReplyId,
    /// The submitted text, as typed
    pub prompt: String,
    /// Step active when the text was appended; the reply's log line uses it
    pub step: u64,
}

/// All mutable controller state of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: InteractionMode,
    /// Step of the next user append. Starts at 1, only ever increments.
    pub step: u64,
    pub pending: Option<PendingReply>,
}

impl SessionState {
    pub fn is_awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: InteractionMode::FreeText,
            step: 1,
            pending: None,
        }
    }
}

/// Default delay before the simulated backend answers
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub reply_delay: Duration,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, reply_delay: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            reply_delay,
        }
    }
}
