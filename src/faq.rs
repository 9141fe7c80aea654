// SPDX-License-Identifier: MIT OR Apache-2.0

//! FAQ entries and the JSON loader.
//!
//! The FAQ file is a JSON array of `{ "question": ..., "answer": ... }`
//! objects. Entries are identified by their position in that array.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the FAQ file, relative to the working directory.
pub const DEFAULT_FAQ_PATH: &str = "data/faq.json";

/// A single question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Load FAQ entries from a JSON file.
pub fn load_faq(path: impl AsRef<Path>) -> Result<Vec<FaqEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read FAQ file: {}", path.display()))?;
    parse_faq(&content).with_context(|| format!("Invalid FAQ file: {}", path.display()))
}

/// Parse FAQ entries from JSON text.
pub fn parse_faq(content: &str) -> Result<Vec<FaqEntry>> {
    let entries: Vec<FaqEntry> = serde_json::from_str(content)
        .context("FAQ data must be a JSON array of question/answer objects")?;

    for (idx, entry) in entries.iter().enumerate() {
        if entry.question.trim().is_empty() {
            bail!("FAQ entry {} has an empty question", idx);
        }
    }

    Ok(entries)
}

/// Questions in corpus order, ready for embedding.
pub fn questions(entries: &[FaqEntry]) -> Vec<String> {
    entries.iter().map(|e| e.question.clone()).collect()
}
