// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation transcript
//!
//! The ordered message history submitted to the model on every turn.

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Function result fed back to the model
    Function,
}

/// A function call issued by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    /// Name of the function to invoke
    pub name: String,
    /// Argument payload as provider-supplied JSON text
    pub arguments: String,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Text content of the message
    pub content: String,

    /// Function call payload (assistant messages that request a call)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,

    /// Function name (function-result messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            function_call: None,
            name: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            function_call: None,
            name: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            function_call: None,
            name: None,
        }
    }

    /// Create an assistant message carrying a function call request
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            function_call: Some(call),
            name: None,
        }
    }

    /// Create a function-result message
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: content.into(),
            function_call: None,
            name: Some(name.into()),
        }
    }

    /// Check if this message requests a function call
    pub fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Function => write!(f, "function"),
        }
    }
}

/// Ordered conversation history
///
/// The first message is always the system prompt; `reset` truncates back to
/// it. Insertion order is conversation order and is never rearranged.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create a transcript seeded with a system prompt
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Append a message to the conversation
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Truncate back to the leading system message
    pub fn reset(&mut self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(ParleyError::InvalidState(
                "cannot reset an empty transcript".to_string(),
            ));
        }
        self.messages.truncate(1);
        Ok(())
    }

    /// Immutable ordered copy for submission to the completion client
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// All messages in conversation order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the transcript is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop messages appended after a previously recorded length
    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }
}
