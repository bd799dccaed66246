// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Parley
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for Parley operations
#[derive(Error, Debug)]
pub enum ParleyError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A function with the same name is already registered
    #[error("Function already registered: {0}")]
    DuplicateFunction(String),

    /// The model requested a function that is not registered
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Function argument payload failed to parse or validate
    #[error("Invalid function arguments: {0}")]
    InvalidArguments(String),

    /// A registered function handler failed
    #[error("Function execution failed: {0}")]
    FunctionExecution(String),

    /// The model kept requesting functions past the configured round cap
    #[error("Function call loop exceeded {rounds} rounds")]
    FunctionLoopExceeded { rounds: u32 },

    /// Operation attempted on a transcript in an unusable state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Whether this error is recoverable by the model reacting to it in
    /// conversation, rather than aborting the turn.
    pub fn is_function_failure(&self) -> bool {
        matches!(
            self,
            ParleyError::UnknownFunction(_)
                | ParleyError::InvalidArguments(_)
                | ParleyError::FunctionExecution(_)
        )
    }
}
