// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session management
//!
//! The public facade composing the transcript, the function registry, and
//! the completion client behind `ask` and `reset`.

pub mod streaming;
mod turn;

pub use turn::{TurnOutcome, TurnResult};

use std::sync::Arc;

use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::provider::CompletionClient;
use crate::transcript::Transcript;

/// Tunables for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum tokens per model response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum function dispatches per turn before the turn fails
    pub max_function_rounds: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.7,
            max_function_rounds: 10,
        }
    }
}

/// An interactive chat session
///
/// Owns its transcript and function registry for its lifetime; the
/// completion client is a stateless collaborator shared across turns.
/// Not thread-safe: `ask` takes `&mut self`, so concurrent turns on one
/// session are rejected at compile time.
pub struct Session {
    client: Arc<dyn CompletionClient>,
    deployment: String,
    transcript: Transcript,
    registry: FunctionRegistry,
    options: SessionOptions,
}

impl Session {
    /// Create a session with default options
    pub fn new(
        client: Arc<dyn CompletionClient>,
        deployment: impl Into<String>,
        system_prompt: impl Into<String>,
        registry: FunctionRegistry,
    ) -> Self {
        Self::with_options(
            client,
            deployment,
            system_prompt,
            registry,
            SessionOptions::default(),
        )
    }

    /// Create a session with explicit options
    pub fn with_options(
        client: Arc<dyn CompletionClient>,
        deployment: impl Into<String>,
        system_prompt: impl Into<String>,
        registry: FunctionRegistry,
        options: SessionOptions,
    ) -> Self {
        Self {
            client,
            deployment: deployment.into(),
            transcript: Transcript::with_system(system_prompt),
            registry,
            options,
        }
    }

    /// Run one user turn, streaming visible text to `on_token` as it
    /// arrives. Returns the final assistant text once the model stops
    /// requesting function calls.
    ///
    /// Lower-layer errors are returned unmodified so the caller can
    /// distinguish transport failures from session failures.
    pub async fn ask(
        &mut self,
        user_text: &str,
        mut on_token: impl FnMut(&str),
    ) -> Result<TurnResult> {
        tracing::debug!(
            target: "parley.session",
            client = self.client.name(),
            deployment = %self.deployment,
            "starting turn"
        );

        turn::run_turn(
            self.client.as_ref(),
            &self.deployment,
            &mut self.transcript,
            &self.registry,
            &self.options,
            user_text,
            &mut on_token,
        )
        .await
    }

    /// Truncate the conversation back to the system prompt
    pub fn reset(&mut self) -> Result<()> {
        self.transcript.reset()
    }

    /// The conversation so far
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The registered functions
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}
