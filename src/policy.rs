//! Mode selection after a simulated reply
//!
//! With probability `structured_probability` the next prompt is structured,
//! split evenly between a yes/no confirmation and a single-select over the
//! configured options. Otherwise the session goes back to free text.

use crate::runtime::RandomSource;
use crate::state_machine::{InteractionMode, OptionSet};

pub const DEFAULT_STRUCTURED_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct ModePolicy {
    /// In `[0, 1]`
    pub structured_probability: f64,
    pub options: OptionSet,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self {
            structured_probability: DEFAULT_STRUCTURED_PROBABILITY,
            options: OptionSet::default(),
        }
    }
}

impl ModePolicy {
    /// Out-of-range probabilities are clamped; NaN falls back to the default
    pub fn new(structured_probability: f64, options: OptionSet) -> Self {
        let structured_probability = if structured_probability.is_nan() {
            DEFAULT_STRUCTURED_PROBABILITY
        } else {
            structured_probability.clamp(0.0, 1.0)
        };
        Self {
            structured_probability,
            options,
        }
    }

    /// Pick the mode that follows a reply. Draws fresh values every call.
    pub fn select(&self, rng: &mut dyn RandomSource) -> InteractionMode {
        // Only a draw strictly below the probability is structured, so NaN
        // never is
        let structured = rng.next_unit() < self.structured_probability;
        if !structured {
            return InteractionMode::FreeText;
        }
        if rng.next_unit() < 0.5 {
            InteractionMode::Confirmation
        } else {
            InteractionMode::SingleSelect {
                options: self.options.clone(),
            }
        }
    }
}
