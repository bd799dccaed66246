// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock completion client for testing
//!
//! Provides a configurable mock implementation of the CompletionClient trait
//! that can be used in unit tests without making real API calls.

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ApiError, ParleyError, Result};
use crate::provider::{
    CompletionClient, CompletionRequest, FinishReason, FragmentStream, StreamFragment,
};

/// A mock completion client for testing
#[derive(Clone, Default)]
pub struct MockClient {
    /// Scripted turns, consumed in order (the last one repeats)
    turns: Arc<Mutex<Vec<MockTurn>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// One scripted stream response
#[derive(Clone, Debug, Default)]
pub struct MockTurn {
    /// Fragments yielded in order
    pub fragments: Vec<StreamFragment>,
    /// Fail before yielding anything
    pub request_error: Option<ApiError>,
    /// Fail after the fragments have been yielded
    pub stream_error: Option<ApiError>,
}

impl MockTurn {
    /// A turn streaming the given text in one delta, then a normal stop
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            fragments: vec![
                StreamFragment::text(text),
                StreamFragment::finish(FinishReason::Stop),
            ],
            ..Default::default()
        }
    }

    /// A turn requesting a function call and nothing else
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            fragments: vec![
                StreamFragment::function_call(name, arguments),
                StreamFragment::finish(FinishReason::FunctionCall),
            ],
            ..Default::default()
        }
    }

    /// A turn built from explicit fragments
    pub fn fragments(fragments: Vec<StreamFragment>) -> Self {
        Self {
            fragments,
            ..Default::default()
        }
    }

    /// A turn that fails before yielding anything
    pub fn request_failure(error: ApiError) -> Self {
        Self {
            request_error: Some(error),
            ..Default::default()
        }
    }

    /// Make this turn fail after its fragments have been yielded
    pub fn then_fail(mut self, error: ApiError) -> Self {
        self.stream_error = Some(error);
        self
    }
}

impl MockClient {
    /// Create a new mock client with no scripted turns; streaming before any
    /// turn is queued yields an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers every request with the given text
    pub fn with_text_response(text: impl Into<String>) -> Self {
        let client = Self::new();
        client.push_turn(MockTurn::text(text));
        client
    }

    /// Create a mock scripted with the given turns, played in order
    pub fn with_turns(turns: Vec<MockTurn>) -> Self {
        let client = Self::new();
        *client.turns.lock().unwrap() = turns;
        client
    }

    /// Queue another scripted turn
    pub fn push_turn(&self, turn: MockTurn) {
        self.turns.lock().unwrap().push(turn);
    }

    /// Get the number of times stream_chat() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.recorded_requests.lock().unwrap().last().cloned()
    }

    fn next_turn(&self) -> MockTurn {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            MockTurn::default()
        } else {
            turns[count.min(turns.len() - 1)].clone()
        }
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(&self, request: CompletionRequest) -> Result<FragmentStream> {
        self.recorded_requests.lock().unwrap().push(request);

        let turn = self.next_turn();

        if let Some(error) = turn.request_error {
            return Err(ParleyError::Api(error));
        }

        let mut items: Vec<Result<StreamFragment>> =
            turn.fragments.into_iter().map(Ok).collect();
        if let Some(error) = turn.stream_error {
            items.push(Err(ParleyError::Api(error)));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}
