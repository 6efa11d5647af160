//! Session configuration from the environment

use crate::policy::{ModePolicy, DEFAULT_STRUCTURED_PROBABILITY};
use crate::state_machine::state::DEFAULT_REPLY_DELAY;
use crate::state_machine::{OptionSet, OptionSetError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("DASHBOARD_OPTIONS: {0}")]
    Options(#[from] OptionSetError),
}

/// How the terminal front end draws frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reply_delay: Duration,
    pub policy: ModePolicy,
    /// Fixed seed for reproducible mode selection
    pub seed: Option<u64>,
    pub dark_mode: bool,
    pub render_format: RenderFormat,
    pub log_json: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            policy: ModePolicy::default(),
            seed: None,
            dark_mode: false,
            render_format: RenderFormat::Text,
            log_json: false,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("DASHBOARD_REPLY_DELAY_MS") {
            let ms = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "DASHBOARD_REPLY_DELAY_MS",
                expected: "a number of milliseconds",
                value: value.clone(),
            })?;
            config.reply_delay = Duration::from_millis(ms);
        }

        let probability = match lookup("DASHBOARD_STRUCTURED_PROBABILITY") {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| (0.0..=1.0).contains(p))
                .ok_or(ConfigError::Invalid {
                    var: "DASHBOARD_STRUCTURED_PROBABILITY",
                    expected: "a probability between 0 and 1",
                    value,
                })?,
            None => DEFAULT_STRUCTURED_PROBABILITY,
        };

        let options = match lookup("DASHBOARD_OPTIONS") {
            Some(value) => OptionSet::new(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty()),
            )?,
            None => OptionSet::default(),
        };
        config.policy = ModePolicy::new(probability, options);

        if let Some(value) = lookup("DASHBOARD_SEED") {
            config.seed = Some(value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DASHBOARD_SEED",
                expected: "an unsigned integer",
                value: value.clone(),
            })?);
        }

        if let Some(value) = lookup("DASHBOARD_DARK_MODE") {
            config.dark_mode = parse_flag("DASHBOARD_DARK_MODE", &value)?;
        }

        if let Some(value) = lookup("DASHBOARD_LOG_JSON") {
            config.log_json = parse_flag("DASHBOARD_LOG_JSON", &value)?;
        }

        if let Some(value) = lookup("DASHBOARD_RENDER") {
            config.render_format = match value.trim().to_ascii_lowercase().as_str() {
                "text" => RenderFormat::Text,
                "json" => RenderFormat::Json,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DASHBOARD_RENDER",
                        expected: "\"text\" or \"json\"",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a boolean",
            value: value.to_string(),
        }),
    }
}
