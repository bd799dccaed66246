// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Parley - streaming LLM chat sessions with client-side function calling.
//!
//! This crate exposes the shared runtime used by the `parley` CLI
//! (`src/main.rs`) and by anything else that wants an interactive model
//! session without reimplementing the turn loop.
//!
//! Architecture highlights:
//! - `transcript`: the ordered conversation history and its reset semantics
//! - `functions`: registry of client-side functions advertised to the model
//! - `provider`: completion client boundary plus the OpenAI-compatible and
//!   mock implementations
//! - `session`: turn orchestration, streaming accumulation, public facade
//! - `config`: environment-driven shell configuration

pub mod config;
pub mod error;
pub mod functions;
pub mod provider;
pub mod session;
pub mod transcript;

pub use error::{ApiError, ParleyError, Result};
pub use session::{Session, SessionOptions, TurnOutcome, TurnResult};
