//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable,
//! plus the text and JSON renderings of FAQ matches.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::config::ConfigOutputFormat;
use crate::retrieval::FaqMatch;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize question text (bold)
pub fn colorize_question(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize a label such as `Q:` (cyan)
pub fn colorize_label(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize a similarity score, two decimals (green when strong, yellow otherwise)
pub fn colorize_score(score: f32, use_color: bool) -> String {
    let text = format!("{:.2}", score);
    if !use_color {
        return text;
    }
    if score >= 0.5 {
        text.green().to_string()
    } else {
        text.yellow().to_string()
    }
}

/// Colorize secondary text (dimmed)
pub fn colorize_dim(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Render one match as the `Q:`/`A:`/`Confidence:` block.
pub fn format_match(m: &FaqMatch, use_color: bool) -> String {
    format!(
        "{} {}\n{} {}\n{} {}",
        colorize_label("Q:", use_color),
        colorize_question(&m.question, use_color),
        colorize_label("A:", use_color),
        m.answer,
        colorize_label("Confidence:", use_color),
        colorize_score(m.score, use_color),
    )
}

/// Write matches in the requested format.
pub fn write_matches<W: Write>(
    out: &mut W,
    matches: &[FaqMatch],
    format: ConfigOutputFormat,
    use_color: bool,
) -> Result<()> {
    match format {
        ConfigOutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string(matches)?)?;
        }
        ConfigOutputFormat::Text => {
            if matches.is_empty() {
                writeln!(out, "{}", colorize_dim("No matching FAQ entries.", use_color))?;
            }
            for m in matches {
                writeln!(out)?;
                writeln!(out, "{}", format_match(m, use_color))?;
            }
        }
    }
    Ok(())
}
