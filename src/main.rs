// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Parley CLI - interactive streaming chat with function calling.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley::config::Settings;
use parley::functions::FunctionRegistry;
use parley::provider::OpenAiClient;
use parley::{ApiError, ParleyError, Session};

#[derive(Parser)]
#[command(name = "parley", version, about = "Streaming chat with client-side function calling")]
struct Cli {
    /// API base URL (overrides OPENAI_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Chat model deployment name (overrides OPENAI_CHAT_DEPLOYMENT)
    #[arg(long)]
    deployment: Option<String>,

    /// System prompt (overrides OPENAI_SYSTEM_PROMPT)
    #[arg(long)]
    system: Option<String>,

    /// Maximum function dispatches per turn
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Enable verbose diagnostics (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing. `-v` enables session diagnostics without requiring
    // users to know target names up front; RUST_LOG still takes precedence.
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if cli.verbose > 0 {
        for directive in ["parley.session=debug", "parley.provider=debug"] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Please set the environment variables.");
            std::process::exit(1);
        }
    };

    if let Some(endpoint) = cli.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(deployment) = cli.deployment {
        settings.deployment = deployment;
    }
    if let Some(system) = cli.system {
        settings.system_prompt = system;
    }
    if let Some(max_rounds) = cli.max_rounds {
        settings.max_function_rounds = max_rounds;
    }

    let client = Arc::new(OpenAiClient::new(&settings.endpoint, &settings.api_key));
    let mut session = Session::with_options(
        client,
        &settings.deployment,
        &settings.system_prompt,
        FunctionRegistry::with_builtins(),
        settings.session_options(),
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("User: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let user_text = line.trim();
        if user_text.is_empty() || user_text == "exit" {
            break;
        }

        print!("\nAssistant: ");
        std::io::stdout().flush()?;

        let outcome = session
            .ask(user_text, |token| {
                print!("{}", token);
                let _ = std::io::stdout().flush();
            })
            .await;

        match outcome {
            Ok(_) => println!("\n"),
            Err(ParleyError::Api(ApiError::AuthenticationFailed)) => {
                eprintln!("\nERROR: {}", ApiError::AuthenticationFailed);
                std::process::exit(1);
            }
            Err(e) => {
                // Transport and turn failures are retryable; keep the loop
                // alive so the user can try again.
                eprintln!("\nERROR: {}", e);
                println!();
            }
        }
    }

    Ok(())
}
