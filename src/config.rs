// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Environment-driven configuration
//!
//! The shell reads everything it needs from the environment and fails fast
//! with a message naming the first missing value.

use crate::error::{ParleyError, Result};
use crate::session::SessionOptions;

/// Environment variable holding the API base URL
pub const ENV_ENDPOINT: &str = "OPENAI_ENDPOINT";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the chat model deployment name
pub const ENV_DEPLOYMENT: &str = "OPENAI_CHAT_DEPLOYMENT";
/// Environment variable holding the system prompt
pub const ENV_SYSTEM_PROMPT: &str = "OPENAI_SYSTEM_PROMPT";
/// Environment variable holding the per-response token cap
pub const ENV_MAX_TOKENS: &str = "PARLEY_MAX_TOKENS";
/// Environment variable holding the sampling temperature
pub const ENV_TEMPERATURE: &str = "PARLEY_TEMPERATURE";
/// Environment variable holding the per-turn function round cap
pub const ENV_MAX_FUNCTION_ROUNDS: &str = "PARLEY_MAX_FUNCTION_ROUNDS";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Settings for the interactive shell
#[derive(Debug, Clone)]
pub struct Settings {
    /// API base URL (e.g. `https://api.openai.com/v1`)
    pub endpoint: String,

    /// API key
    pub api_key: String,

    /// Chat model deployment name
    pub deployment: String,

    /// System prompt seeding every session
    pub system_prompt: String,

    /// Maximum tokens per model response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum function dispatches per turn
    pub max_function_rounds: u32,
}

impl Settings {
    /// Load settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SessionOptions::default();

        Ok(Self {
            endpoint: require(&lookup, ENV_ENDPOINT)?,
            api_key: require(&lookup, ENV_API_KEY)?,
            deployment: require(&lookup, ENV_DEPLOYMENT)?,
            system_prompt: optional(&lookup, ENV_SYSTEM_PROMPT)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: parse_or(&lookup, ENV_MAX_TOKENS, defaults.max_tokens)?,
            temperature: parse_or(&lookup, ENV_TEMPERATURE, defaults.temperature)?,
            max_function_rounds: parse_or(
                &lookup,
                ENV_MAX_FUNCTION_ROUNDS,
                defaults.max_function_rounds,
            )?,
        })
    }

    /// Session tunables derived from these settings
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_function_rounds: self.max_function_rounds,
        }
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(lookup, name).ok_or_else(|| {
        ParleyError::Config(format!("missing required environment variable {}", name))
    })
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match optional(lookup, name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            ParleyError::Config(format!("invalid value for {}: {:?}", name, raw))
        }),
    }
}
