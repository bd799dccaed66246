// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Turn orchestration
//!
//! Drives one user turn: request a stream, feed visible text to the sink,
//! dispatch any function call the model requests, and loop until the model
//! produces a final answer.

use futures::StreamExt;

use crate::error::{ParleyError, Result};
use crate::functions::FunctionRegistry;
use crate::provider::{CompletionClient, CompletionRequest};
use crate::session::streaming::FragmentAccumulator;
use crate::session::SessionOptions;
use crate::transcript::{Message, Transcript};

/// Result of one completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    /// Final assistant text, as committed to the transcript
    pub text: String,
    /// How the turn ended
    pub outcome: TurnOutcome,
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model finished naturally
    Normal,
    /// The response was truncated at the token limit
    TokenLimit,
}

/// Run one user turn against the completion client.
///
/// Provider failures roll the transcript back to the user message so the
/// caller can retry the turn; function failures are absorbed into the
/// conversation instead.
pub(crate) async fn run_turn(
    client: &dyn CompletionClient,
    deployment: &str,
    transcript: &mut Transcript,
    registry: &FunctionRegistry,
    options: &SessionOptions,
    user_text: &str,
    on_token: &mut dyn FnMut(&str),
) -> Result<TurnResult> {
    transcript.append(Message::user(user_text));
    let checkpoint = transcript.len();

    let result = drive_rounds(client, deployment, transcript, registry, options, on_token).await;

    if let Err(ParleyError::Api(_)) = &result {
        tracing::debug!(
            target: "parley.session.turn",
            checkpoint,
            "provider failure, rolling transcript back to the user message"
        );
        transcript.truncate(checkpoint);
    }

    result
}

async fn drive_rounds(
    client: &dyn CompletionClient,
    deployment: &str,
    transcript: &mut Transcript,
    registry: &FunctionRegistry,
    options: &SessionOptions,
    on_token: &mut dyn FnMut(&str),
) -> Result<TurnResult> {
    let mut dispatched: u32 = 0;

    loop {
        tracing::debug!(
            target: "parley.session.turn",
            round = dispatched,
            transcript_messages = transcript.len(),
            "requesting completion stream"
        );

        let request = CompletionRequest::new(deployment, transcript.snapshot())
            .with_functions(registry.specs())
            .with_max_tokens(options.max_tokens)
            .with_temperature(options.temperature);

        let mut stream = client.stream_chat(request).await?;

        let mut accumulator = FragmentAccumulator::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if let Some(visible) = accumulator.absorb(&fragment) {
                on_token(&visible);
            }
        }
        drop(stream);

        let hit_token_limit = accumulator.hit_token_limit();
        let finish_reason = accumulator.finish_reason();
        let (text, call) = accumulator.finish();

        tracing::debug!(
            target: "parley.session.turn",
            round = dispatched,
            ?finish_reason,
            function_call = call.is_some(),
            "stream drained"
        );

        let Some(call) = call else {
            transcript.append(Message::assistant(text.clone()));
            let outcome = if hit_token_limit {
                TurnOutcome::TokenLimit
            } else {
                TurnOutcome::Normal
            };
            tracing::debug!(
                target: "parley.session.turn",
                rounds = dispatched,
                ?outcome,
                "turn complete"
            );
            return Ok(TurnResult { text, outcome });
        };

        if dispatched >= options.max_function_rounds {
            return Err(ParleyError::FunctionLoopExceeded {
                rounds: options.max_function_rounds,
            });
        }
        dispatched += 1;

        tracing::info!(
            target: "parley.session.turn",
            function = %call.name,
            round = dispatched,
            "dispatching function call"
        );

        // Function failures become conversation content so the model can
        // react instead of the turn aborting.
        let result_text = match registry.invoke(&call.name, &call.arguments) {
            Ok(output) => output,
            Err(e) if e.is_function_failure() => {
                tracing::warn!(
                    target: "parley.session.turn",
                    function = %call.name,
                    error = %e,
                    "function call failed"
                );
                e.to_string()
            }
            Err(e) => return Err(e),
        };

        transcript.append(Message::assistant_function_call(call.clone()));
        transcript.append(Message::function_result(&call.name, result_text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::functions::{FunctionDescriptor, SchemaBuilder};
    use crate::provider::{FinishReason, MockClient, MockTurn, StreamFragment};
    use crate::transcript::Role;

    fn time_registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry
            .register(FunctionDescriptor::new(
                "get_time",
                "Get the time",
                SchemaBuilder::new().build(),
                |_| Ok("14:00".to_string()),
            ))
            .unwrap();
        registry
    }

    async fn run(
        client: &MockClient,
        transcript: &mut Transcript,
        registry: &FunctionRegistry,
        options: &SessionOptions,
        user_text: &str,
    ) -> (Result<TurnResult>, Vec<String>) {
        let mut tokens = Vec::new();
        let result = run_turn(
            client,
            "mock-model",
            transcript,
            registry,
            options,
            user_text,
            &mut |token| tokens.push(token.to_string()),
        )
        .await;
        (result, tokens)
    }

    #[tokio::test]
    async fn test_turn_simple_answer() {
        let client = MockClient::with_text_response("4");
        let mut transcript = Transcript::with_system("You are terse.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, tokens) = run(&client, &mut transcript, &registry, &options, "2+2?").await;
        let result = result.unwrap();

        assert_eq!(result.text, "4");
        assert_eq!(result.outcome, TurnOutcome::Normal);
        assert_eq!(tokens, vec!["4"]);

        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(transcript.messages()[2].content, "4");
    }

    #[tokio::test]
    async fn test_turn_token_limit_suffix() {
        let client = MockClient::with_turns(vec![MockTurn::fragments(vec![
            StreamFragment::text("Once upon a time"),
            StreamFragment::finish(FinishReason::Length),
        ])]);
        let mut transcript = Transcript::with_system("Storyteller.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, tokens) =
            run(&client, &mut transcript, &registry, &options, "a story").await;
        let result = result.unwrap();

        assert_eq!(result.text, "Once upon a time\nWARNING: Exceeded token limit!");
        assert_eq!(result.outcome, TurnOutcome::TokenLimit);
        assert_eq!(tokens.concat(), result.text);
        assert_eq!(transcript.last().unwrap().content, result.text);
    }

    #[tokio::test]
    async fn test_turn_function_round() {
        let client = MockClient::with_turns(vec![
            MockTurn::function_call("get_time", "{}"),
            MockTurn::text("It's 14:00."),
        ]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = time_registry();
        let options = SessionOptions::default();

        let (result, tokens) =
            run(&client, &mut transcript, &registry, &options, "what time?").await;
        let result = result.unwrap();

        assert_eq!(result.text, "It's 14:00.");
        assert_eq!(tokens, vec!["It's 14:00."]);
        assert_eq!(client.call_count(), 2);

        // system, user, assistant(function_call), function result, assistant
        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Function,
                Role::Assistant
            ]
        );
        assert!(transcript.messages()[2].has_function_call());
        assert_eq!(transcript.messages()[3].content, "14:00");
        assert_eq!(transcript.messages()[3].name.as_deref(), Some("get_time"));
    }

    #[tokio::test]
    async fn test_turn_second_request_includes_function_result() {
        let client = MockClient::with_turns(vec![
            MockTurn::function_call("get_time", "{}"),
            MockTurn::text("It's 14:00."),
        ]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = time_registry();
        let options = SessionOptions::default();

        let (result, _) = run(&client, &mut transcript, &registry, &options, "time?").await;
        result.unwrap();

        let second_request = client.recorded_requests().into_iter().nth(1).unwrap();
        let roles: Vec<Role> = second_request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Function]
        );
        assert_eq!(second_request.functions.len(), 1);
    }

    #[tokio::test]
    async fn test_turn_function_arguments_never_reach_sink() {
        let client = MockClient::with_turns(vec![
            MockTurn::fragments(vec![
                StreamFragment::text("Checking. "),
                StreamFragment::function_call("get_time", r#"{"secret": "argument"}"#),
                StreamFragment::finish(FinishReason::FunctionCall),
            ]),
            MockTurn::text("Done."),
        ]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = time_registry();
        let options = SessionOptions::default();

        let (result, tokens) = run(&client, &mut transcript, &registry, &options, "go").await;
        result.unwrap();

        let all_tokens = tokens.concat();
        assert!(all_tokens.contains("Checking. "));
        assert!(all_tokens.contains("Done."));
        assert!(!all_tokens.contains("secret"));
        assert!(!all_tokens.contains("argument"));
    }

    #[tokio::test]
    async fn test_turn_unknown_function_absorbed_into_conversation() {
        let client = MockClient::with_turns(vec![
            MockTurn::function_call("no_such_fn", "{}"),
            MockTurn::text("Sorry, I cannot do that."),
        ]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, _) = run(&client, &mut transcript, &registry, &options, "go").await;
        let result = result.unwrap();

        assert_eq!(result.text, "Sorry, I cannot do that.");
        let function_result = &transcript.messages()[3];
        assert_eq!(function_result.role, Role::Function);
        assert!(function_result.content.contains("Unknown function"));
    }

    #[tokio::test]
    async fn test_turn_handler_failure_absorbed_into_conversation() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(FunctionDescriptor::new(
                "flaky",
                "Fails",
                SchemaBuilder::new().build(),
                |_| anyhow::bail!("backend down"),
            ))
            .unwrap();

        let client = MockClient::with_turns(vec![
            MockTurn::function_call("flaky", "{}"),
            MockTurn::text("The function failed."),
        ]);
        let mut transcript = Transcript::with_system("Helpful.");
        let options = SessionOptions::default();

        let (result, _) = run(&client, &mut transcript, &registry, &options, "go").await;
        result.unwrap();

        let function_result = &transcript.messages()[3];
        assert!(function_result.content.contains("backend down"));
    }

    #[tokio::test]
    async fn test_turn_request_error_rolls_back_to_user_message() {
        let client = MockClient::with_turns(vec![MockTurn::request_failure(ApiError::Network(
            "connection refused".to_string(),
        ))]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, tokens) = run(&client, &mut transcript, &registry, &options, "hi").await;

        assert!(matches!(
            result.unwrap_err(),
            ParleyError::Api(ApiError::Network(_))
        ));
        assert!(tokens.is_empty());

        // User message stays, no partial assistant message committed.
        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
    }

    #[tokio::test]
    async fn test_turn_mid_stream_error_commits_nothing() {
        let client = MockClient::with_turns(vec![MockTurn::fragments(vec![StreamFragment::text(
            "partial text",
        )])
        .then_fail(ApiError::StreamError("reset".to_string()))]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, tokens) = run(&client, &mut transcript, &registry, &options, "hi").await;

        assert!(matches!(
            result.unwrap_err(),
            ParleyError::Api(ApiError::StreamError(_))
        ));
        // The sink saw the partial text, but the transcript did not commit it.
        assert_eq!(tokens, vec!["partial text"]);
        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
    }

    #[tokio::test]
    async fn test_turn_function_loop_exceeded() {
        // The model asks for the same function forever.
        let client = MockClient::with_turns(vec![MockTurn::function_call("get_time", "{}")]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = time_registry();
        let options = SessionOptions {
            max_function_rounds: 3,
            ..Default::default()
        };

        let (result, _) = run(&client, &mut transcript, &registry, &options, "loop").await;

        match result.unwrap_err() {
            ParleyError::FunctionLoopExceeded { rounds } => assert_eq!(rounds, 3),
            other => panic!("expected FunctionLoopExceeded, got {:?}", other),
        }
        // 3 dispatches plus the final refused round's request.
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn test_turn_zero_round_cap_rejects_first_call() {
        let client = MockClient::with_turns(vec![MockTurn::function_call("get_time", "{}")]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = time_registry();
        let options = SessionOptions {
            max_function_rounds: 0,
            ..Default::default()
        };

        let (result, _) = run(&client, &mut transcript, &registry, &options, "go").await;
        assert!(matches!(
            result.unwrap_err(),
            ParleyError::FunctionLoopExceeded { rounds: 0 }
        ));
    }

    #[tokio::test]
    async fn test_turn_sink_receives_tokens_in_stream_order() {
        let client = MockClient::with_turns(vec![MockTurn::fragments(vec![
            StreamFragment::text("a"),
            StreamFragment::text("b"),
            StreamFragment::text("c"),
            StreamFragment::finish(FinishReason::Stop),
        ])]);
        let mut transcript = Transcript::with_system("Helpful.");
        let registry = FunctionRegistry::new();
        let options = SessionOptions::default();

        let (result, tokens) = run(&client, &mut transcript, &registry, &options, "abc").await;
        let result = result.unwrap();

        assert_eq!(tokens, vec!["a", "b", "c"]);
        assert_eq!(result.text, "abc");
    }
}
