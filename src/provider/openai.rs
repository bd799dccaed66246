// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible chat completions client
//!
//! Implements the CompletionClient trait against any endpoint speaking the
//! OpenAI chat completions protocol with SSE streaming and the classic
//! `functions` / `function_call` calling convention.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ParleyError, Result};
use crate::functions::FunctionSpec;
use crate::provider::{
    CompletionClient, CompletionRequest, FinishReason, FragmentStream, FunctionCallDelta,
    StreamFragment,
};
use crate::transcript::Message;

/// Client for an OpenAI-compatible chat completions endpoint
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a new client for the given API base URL (e.g.
    /// `https://api.openai.com/v1`)
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatRequestBody {
        ChatRequestBody {
            model: request.deployment.clone(),
            messages: convert_messages(&request.messages),
            functions: request.functions.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        }
    }

    fn parse_error(&self, status: u16, body: &str) -> ParleyError {
        if status == 401 || status == 403 {
            return ParleyError::Api(ApiError::AuthenticationFailed);
        }

        if let Ok(error_response) = serde_json::from_str::<WireErrorResponse>(body) {
            let code = error_response.error.code.as_deref().unwrap_or("");
            match code {
                "invalid_api_key" | "authentication_error" => {
                    ParleyError::Api(ApiError::AuthenticationFailed)
                }
                _ => ParleyError::Api(ApiError::ServerError {
                    status,
                    message: error_response.error.message,
                }),
            }
        } else {
            ParleyError::Api(ApiError::ServerError {
                status,
                message: body.to_string(),
            })
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let body = self.build_body(&request);

        tracing::debug!(
            target: "parley.provider.openai",
            deployment = %request.deployment,
            messages = request.messages.len(),
            functions = request.functions.len(),
            "starting streaming completion"
        );

        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Api(ApiError::Network(e.to_string())))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body));
        }

        let byte_stream = response.bytes_stream();

        let fragment_stream = async_stream::try_stream! {
            let mut buffer = String::new();

            for await chunk_result in byte_stream {
                let chunk = chunk_result
                    .map_err(|e| ParleyError::Api(ApiError::StreamError(e.to_string())))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Parse SSE events (data: ... lines)
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        if data == "[DONE]" {
                            continue;
                        }

                        if let Ok(chunk) = serde_json::from_str::<ChatStreamChunk>(data) {
                            if let Some(fragment) = fragment_from_chunk(chunk) {
                                yield fragment;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(fragment_stream))
    }
}

/// Convert transcript messages to the wire format
fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.to_string(),
            // Assistant function-call messages carry a null content field
            content: if m.function_call.is_some() && m.content.is_empty() {
                None
            } else {
                Some(m.content.clone())
            },
            function_call: m.function_call.as_ref().map(|call| WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            }),
            name: m.name.clone(),
        })
        .collect()
}

/// Convert one parsed SSE chunk into a stream fragment
fn fragment_from_chunk(chunk: ChatStreamChunk) -> Option<StreamFragment> {
    let choice = chunk.choices.into_iter().next()?;

    let delta_text = choice.delta.content.filter(|text| !text.is_empty());
    let function_call = choice.delta.function_call.map(|fc| FunctionCallDelta {
        name: fc.name,
        arguments: fc.arguments,
    });
    let finish_reason = choice.finish_reason.as_deref().map(map_finish_reason);

    if delta_text.is_none() && function_call.is_none() && finish_reason.is_none() {
        return None;
    }

    Some(StreamFragment {
        delta_text,
        function_call,
        finish_reason,
    })
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "function_call" | "tool_calls" => FinishReason::FunctionCall,
        _ => FinishReason::Other,
    }
}

// Wire types (OpenAI chat completions protocol)

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    functions: Vec<FunctionSpec>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<StreamFunctionCallDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionCallDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}
