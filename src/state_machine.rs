//! Core interaction state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, UserAction};
pub use state::{
    Author, ChatEntry, InteractionMode, LogLine, OptionSet, OptionSetError, PendingReply, ReplyId,
    SessionContext, SessionState,
};
pub use transition::{transition, TransitionError, TransitionResult, AFFIRM_LABEL, DENY_LABEL};
