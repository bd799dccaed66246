// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Completion client abstraction
//!
//! Defines the boundary to the model provider: a request built from a
//! transcript snapshot, answered with a lazy stream of incremental fragments.

pub mod mock;
pub mod openai;

pub use mock::{MockClient, MockTurn};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::functions::FunctionSpec;
use crate::transcript::Message;

/// Lazy sequence of incremental response fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

/// Boundary to the model provider
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Get the client name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Start a streaming chat completion for the given request.
    ///
    /// The returned stream is consumed exactly once, in order, and is
    /// finite. The call itself may fail before anything is yielded
    /// (authentication, connectivity); mid-stream failures surface as `Err`
    /// items.
    async fn stream_chat(&self, request: CompletionRequest) -> Result<FragmentStream>;
}

/// Request for a streaming completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model deployment to use
    pub deployment: String,

    /// Transcript snapshot, in conversation order
    pub messages: Vec<Message>,

    /// Functions advertised to the model
    pub functions: Vec<FunctionSpec>,

    /// Maximum tokens in the response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(deployment: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            deployment: deployment.into(),
            messages,
            functions: vec![],
            max_tokens: 8192,
            temperature: 0.7,
        }
    }

    /// Set the advertised functions
    pub fn with_functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = functions;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// One incremental unit of a streamed response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamFragment {
    /// Visible text delta
    pub delta_text: Option<String>,

    /// Incremental piece of a function call request
    pub function_call: Option<FunctionCallDelta>,

    /// Why the model stopped, when this fragment carries the signal
    pub finish_reason: Option<FinishReason>,
}

/// Incremental function call data; the name typically arrives once, the
/// argument text in pieces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionCallDelta {
    /// Function name piece
    pub name: Option<String>,

    /// Argument JSON text piece
    pub arguments: Option<String>,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of message
    Stop,
    /// Hit the token limit
    Length,
    /// Wants to call a function
    FunctionCall,
    /// Any other provider-specific reason
    Other,
}

impl StreamFragment {
    /// Fragment carrying only a text delta
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            delta_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Fragment carrying only a finish reason
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Fragment carrying a complete function call request
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            function_call: Some(FunctionCallDelta {
                name: Some(name.into()),
                arguments: Some(arguments.into()),
            }),
            ..Default::default()
        }
    }

    /// Fragment carrying a piece of function call argument text
    pub fn function_arguments(arguments: impl Into<String>) -> Self {
        Self {
            function_call: Some(FunctionCallDelta {
                name: None,
                arguments: Some(arguments.into()),
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_new() {
        let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hello")]);

        assert_eq!(request.deployment, "gpt-4o");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 8192);
        assert!((request.temperature - 0.7).abs() < 0.001);
        assert!(request.functions.is_empty());
    }

    #[test]
    fn test_completion_request_chained() {
        let request = CompletionRequest::new("gpt-4o", vec![])
            .with_max_tokens(2048)
            .with_temperature(0.2)
            .with_functions(vec![FunctionSpec {
                name: "get_current_time".to_string(),
                description: "Get the current time".to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            }]);

        assert_eq!(request.max_tokens, 2048);
        assert!((request.temperature - 0.2).abs() < 0.001);
        assert_eq!(request.functions.len(), 1);
    }

    #[test]
    fn test_stream_fragment_text() {
        let fragment = StreamFragment::text("Hello");
        assert_eq!(fragment.delta_text.as_deref(), Some("Hello"));
        assert!(fragment.function_call.is_none());
        assert!(fragment.finish_reason.is_none());
    }

    #[test]
    fn test_stream_fragment_finish() {
        let fragment = StreamFragment::finish(FinishReason::Stop);
        assert_eq!(fragment.finish_reason, Some(FinishReason::Stop));
        assert!(fragment.delta_text.is_none());
    }

    #[test]
    fn test_stream_fragment_function_call() {
        let fragment = StreamFragment::function_call("get_current_time", "{}");
        let call = fragment.function_call.unwrap();
        assert_eq!(call.name.as_deref(), Some("get_current_time"));
        assert_eq!(call.arguments.as_deref(), Some("{}"));
    }

    #[test]
    fn test_stream_fragment_function_arguments_piece() {
        let fragment = StreamFragment::function_arguments("{\"loc");
        let call = fragment.function_call.unwrap();
        assert!(call.name.is_none());
        assert_eq!(call.arguments.as_deref(), Some("{\"loc"));
    }

    #[test]
    fn test_finish_reason_equality() {
        assert_eq!(FinishReason::Stop, FinishReason::Stop);
        assert_ne!(FinishReason::Stop, FinishReason::Length);
        assert_ne!(FinishReason::FunctionCall, FinishReason::Other);
    }
}
