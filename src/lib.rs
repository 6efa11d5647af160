//! Chat dashboard core
//!
//! A turn-taking chat session: free text, yes/no confirmations and
//! single-select prompts, with a simulated backend that answers after a
//! fixed delay and an activity log that mirrors every completed turn.

pub mod config;
pub mod policy;
pub mod render;
pub mod runtime;
pub mod state_machine;
pub mod store;
