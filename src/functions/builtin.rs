// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Built-in demo functions
//!
//! A small set of ready-made functions the interactive shell registers so a
//! fresh install has something for the model to call.

use chrono::{Datelike, Local, Timelike};
use serde_json::Value;

use super::{FunctionDescriptor, SchemaBuilder};

/// All built-in function descriptors
pub fn all() -> Vec<FunctionDescriptor> {
    vec![current_date(), current_time(), current_weather()]
}

/// `get_current_date`: today's date as `YYYY-M-D`
pub fn current_date() -> FunctionDescriptor {
    FunctionDescriptor::new(
        "get_current_date",
        "Get the current date",
        SchemaBuilder::new().build(),
        |_| {
            let today = Local::now();
            Ok(format!(
                "{}-{}-{}",
                today.year(),
                today.month(),
                today.day()
            ))
        },
    )
}

/// `get_current_time`: wall-clock time as `HH:MM`
pub fn current_time() -> FunctionDescriptor {
    FunctionDescriptor::new(
        "get_current_time",
        "Get the current time",
        SchemaBuilder::new().build(),
        |_| {
            let now = Local::now();
            Ok(format!("{:02}:{:02}", now.hour(), now.minute()))
        },
    )
}

/// `get_current_weather`: canned weather report for a location
pub fn current_weather() -> FunctionDescriptor {
    FunctionDescriptor::new(
        "get_current_weather",
        "Get the current weather in a given location",
        SchemaBuilder::new()
            .string(
                "location",
                "The city and state, e.g. San Francisco, CA",
                true,
            )
            .string_enum("unit", "Temperature unit", &["celsius", "fahrenheit"], false)
            .build(),
        |args| {
            let location = args
                .get("location")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("location must be a string"))?;
            Ok(format!(
                "The weather in {} is 72 degrees and sunny.",
                location
            ))
        },
    )
}
