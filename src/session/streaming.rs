// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response handling
//!
//! This module provides testable logic for assembling a streamed response.
//! It separates fragment processing from the actual I/O operations.

use crate::provider::{FinishReason, StreamFragment};
use crate::transcript::FunctionCall;

/// Warning appended when the provider reports the response was truncated.
pub const TOKEN_LIMIT_WARNING: &str = "\nWARNING: Exceeded token limit!";

/// Accumulator for one streamed model response
///
/// Visible text and function-call data travel interleaved in the same
/// stream; the accumulator keeps them apart so argument text never reaches
/// the caller's sink.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    /// Visible text accumulated so far
    text: String,
    /// Function name pieces, if the model requested a call
    function_name: String,
    /// Function argument text pieces
    function_arguments: String,
    /// Whether any function call data was seen
    saw_function_call: bool,
    /// Whether the token limit finish reason was seen
    hit_token_limit: bool,
    /// Finish reason reported by the stream
    finish_reason: Option<FinishReason>,
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one fragment and return the text to forward to the sink, if
    /// any. Function-call data is recorded but never returned as visible
    /// text. The token-limit warning is emitted exactly once, attached to
    /// the fragment that carried the finish reason.
    pub fn absorb(&mut self, fragment: &StreamFragment) -> Option<String> {
        let mut visible = String::new();

        if let Some(text) = fragment.delta_text.as_deref() {
            if !text.is_empty() {
                visible.push_str(text);
                self.text.push_str(text);
            }
        }

        if let Some(call) = &fragment.function_call {
            self.saw_function_call = true;
            if let Some(name) = call.name.as_deref() {
                self.function_name.push_str(name);
            }
            if let Some(arguments) = call.arguments.as_deref() {
                self.function_arguments.push_str(arguments);
            }
        }

        if let Some(reason) = fragment.finish_reason {
            self.finish_reason = Some(reason);
            if reason == FinishReason::Length && !self.hit_token_limit {
                self.hit_token_limit = true;
                visible.push_str(TOKEN_LIMIT_WARNING);
                self.text.push_str(TOKEN_LIMIT_WARNING);
            }
        }

        if visible.is_empty() {
            None
        } else {
            Some(visible)
        }
    }

    /// Whether the model requested a function call
    pub fn has_function_call(&self) -> bool {
        self.saw_function_call
    }

    /// Whether the token limit was hit
    pub fn hit_token_limit(&self) -> bool {
        self.hit_token_limit
    }

    /// Finish reason reported by the stream, if any
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Consume the accumulator and return the assembled text plus the
    /// completed function call request, if one was made.
    pub fn finish(self) -> (String, Option<FunctionCall>) {
        let call = if self.saw_function_call {
            Some(FunctionCall {
                name: self.function_name,
                arguments: self.function_arguments,
            })
        } else {
            None
        };
        (self.text, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_new() {
        let acc = FragmentAccumulator::new();
        assert!(!acc.has_function_call());
        assert!(!acc.hit_token_limit());
        assert!(acc.finish_reason().is_none());
    }

    #[test]
    fn test_accumulator_concatenates_text_in_order() {
        let mut acc = FragmentAccumulator::new();

        assert_eq!(acc.absorb(&StreamFragment::text("Hello ")).as_deref(), Some("Hello "));
        assert_eq!(acc.absorb(&StreamFragment::text("World")).as_deref(), Some("World"));
        acc.absorb(&StreamFragment::finish(FinishReason::Stop));

        let (text, call) = acc.finish();
        assert_eq!(text, "Hello World");
        assert!(call.is_none());
    }

    #[test]
    fn test_accumulator_empty_delta_not_forwarded() {
        let mut acc = FragmentAccumulator::new();
        assert!(acc.absorb(&StreamFragment::text("")).is_none());
        let (text, _) = acc.finish();
        assert!(text.is_empty());
    }

    #[test]
    fn test_accumulator_token_limit_suffix() {
        let mut acc = FragmentAccumulator::new();

        acc.absorb(&StreamFragment::text("Once upon a time"));
        let visible = acc.absorb(&StreamFragment::finish(FinishReason::Length));

        assert_eq!(visible.as_deref(), Some(TOKEN_LIMIT_WARNING));
        assert!(acc.hit_token_limit());

        let (text, _) = acc.finish();
        assert_eq!(text, "Once upon a time\nWARNING: Exceeded token limit!");
    }

    #[test]
    fn test_accumulator_token_limit_suffix_with_trailing_delta() {
        // A fragment can carry both a final delta and the finish reason; the
        // warning lands after the delta.
        let mut acc = FragmentAccumulator::new();

        let visible = acc.absorb(&StreamFragment {
            delta_text: Some("end".to_string()),
            function_call: None,
            finish_reason: Some(FinishReason::Length),
        });

        assert_eq!(
            visible.as_deref(),
            Some("end\nWARNING: Exceeded token limit!")
        );
    }

    #[test]
    fn test_accumulator_token_limit_warning_emitted_once() {
        let mut acc = FragmentAccumulator::new();

        acc.absorb(&StreamFragment::finish(FinishReason::Length));
        let second = acc.absorb(&StreamFragment::finish(FinishReason::Length));

        assert!(second.is_none());
        let (text, _) = acc.finish();
        assert_eq!(text, TOKEN_LIMIT_WARNING);
    }

    #[test]
    fn test_accumulator_stop_has_no_suffix() {
        let mut acc = FragmentAccumulator::new();
        acc.absorb(&StreamFragment::text("4"));
        acc.absorb(&StreamFragment::finish(FinishReason::Stop));

        let (text, _) = acc.finish();
        assert_eq!(text, "4");
    }

    #[test]
    fn test_accumulator_function_call_not_visible() {
        let mut acc = FragmentAccumulator::new();

        let visible = acc.absorb(&StreamFragment::function_call(
            "get_current_weather",
            r#"{"location": "Paris"}"#,
        ));
        assert!(visible.is_none());
        assert!(acc.has_function_call());

        let (text, call) = acc.finish();
        assert!(text.is_empty());
        let call = call.unwrap();
        assert_eq!(call.name, "get_current_weather");
        assert_eq!(call.arguments, r#"{"location": "Paris"}"#);
    }

    #[test]
    fn test_accumulator_function_call_assembled_from_pieces() {
        let mut acc = FragmentAccumulator::new();

        acc.absorb(&StreamFragment {
            delta_text: None,
            function_call: Some(crate::provider::FunctionCallDelta {
                name: Some("get_current_time".to_string()),
                arguments: Some(String::new()),
            }),
            finish_reason: None,
        });
        acc.absorb(&StreamFragment::function_arguments("{\"zone\":"));
        acc.absorb(&StreamFragment::function_arguments("\"UTC\"}"));
        acc.absorb(&StreamFragment::finish(FinishReason::FunctionCall));

        let (_, call) = acc.finish();
        let call = call.unwrap();
        assert_eq!(call.name, "get_current_time");
        assert_eq!(call.arguments, "{\"zone\":\"UTC\"}");
    }

    #[test]
    fn test_accumulator_narration_interleaved_with_function_call() {
        let mut acc = FragmentAccumulator::new();

        let first = acc.absorb(&StreamFragment::text("Let me check. "));
        assert_eq!(first.as_deref(), Some("Let me check. "));

        let second = acc.absorb(&StreamFragment::function_call("get_current_time", "{}"));
        assert!(second.is_none());

        acc.absorb(&StreamFragment::finish(FinishReason::FunctionCall));

        assert!(acc.has_function_call());
        let (text, call) = acc.finish();
        assert_eq!(text, "Let me check. ");
        assert!(call.is_some());
    }

    #[test]
    fn test_accumulator_records_finish_reason() {
        let mut acc = FragmentAccumulator::new();
        acc.absorb(&StreamFragment::finish(FinishReason::FunctionCall));
        assert_eq!(acc.finish_reason(), Some(FinishReason::FunctionCall));
    }

    #[test]
    fn test_accumulator_unicode_text() {
        let mut acc = FragmentAccumulator::new();
        acc.absorb(&StreamFragment::text("Hello "));
        acc.absorb(&StreamFragment::text("世界 "));
        acc.absorb(&StreamFragment::text("\u{1F600}"));

        let (text, _) = acc.finish();
        assert_eq!(text, "Hello 世界 \u{1F600}");
    }
}
