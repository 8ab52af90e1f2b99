// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `obj` as pretty JSON in json mode, otherwise run the text
/// printer.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    obj: &T,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(obj)?);
            Ok(())
        }
        OutputFormat::Text => {
            text();
            Ok(())
        }
    }
}

/// Format a timestamp as relative age (e.g. "5s", "2m", "1h", "3d").
pub fn format_age(from: chrono::DateTime<chrono::Utc>) -> String {
    let secs = (chrono::Utc::now() - from).num_seconds().max(0) as u64;
    if secs >= 86_400 {
        format!("{}d", secs / 86_400)
    } else if secs >= 3_600 {
        format!("{}h", secs / 3_600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
