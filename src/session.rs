// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive question loop.
//!
//! Reads one question per line, answers it, and stops on `exit`, `quit`, or
//! end of input. Generic over reader and writer so tests can drive it.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::config::ConfigOutputFormat;
use crate::engine::FaqEngine;
use crate::output::{colorize_dim, write_matches};
use crate::retrieval::DEFAULT_TOP_K;

pub const PROMPT: &str = "Enter your question: ";

/// Per-session display and retrieval settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub top_k: usize,
    pub min_score: Option<f32>,
    pub format: ConfigOutputFormat,
    pub use_color: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: None,
            format: ConfigOutputFormat::Text,
            use_color: false,
        }
    }
}

/// True when `input` asks to leave the session.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Runs the loop until exit or end of input.
///
/// Returns the number of questions answered. A question that fails (for
/// example one whose embedding is a zero vector) is reported on `output` and
/// the loop keeps going.
pub fn run_session<R: BufRead, W: Write>(
    engine: &mut FaqEngine,
    mut input: R,
    mut output: W,
    options: SessionOptions,
) -> Result<usize> {
    let text_mode = options.format == ConfigOutputFormat::Text;
    if text_mode {
        writeln!(output, "Welcome to the FAQ Retrieval System! Type 'exit' to quit.\n")?;
    }

    let mut answered = 0usize;
    let mut line = String::new();
    loop {
        if text_mode {
            write!(output, "{}", PROMPT)?;
            output.flush()?;
        }

        line.clear();
        if input.read_line(&mut line)? == 0 {
            if text_mode {
                writeln!(output)?;
            }
            break;
        }

        let query = line.trim();
        if is_exit_command(query) {
            break;
        }
        if query.is_empty() {
            continue;
        }

        match engine.ask_above(query, options.top_k, options.min_score) {
            Ok(matches) => {
                if text_mode {
                    writeln!(output, "\nTop Results:")?;
                }
                write_matches(&mut output, &matches, options.format, options.use_color)?;
                if text_mode {
                    writeln!(output)?;
                }
                answered += 1;
            }
            Err(err) => {
                tracing::debug!("query failed: {:#}", err);
                writeln!(
                    output,
                    "{}",
                    colorize_dim(&format!("Error: {:#}", err), options.use_color)
                )?;
            }
        }
    }

    if text_mode {
        writeln!(output, "Goodbye!")?;
    }
    output.flush()?;
    Ok(answered)
}
