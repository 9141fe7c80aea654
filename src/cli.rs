// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// faqseek - Local semantic FAQ lookup
///
/// Embeds a fixed set of question/answer pairs and returns the entries whose
/// questions are most similar to yours.
#[derive(Parser, Debug)]
#[command(name = "faqseek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// FAQ JSON file (defaults to data/faq.json)
    #[arg(long, global = true)]
    pub faq: Option<PathBuf>,

    /// Do not read or write the embedding cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question and exit
    #[command(alias = "a")]
    Ask {
        /// Question text
        query: String,

        /// Number of matches to return
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Hide matches scoring below this similarity
        #[arg(long, allow_hyphen_values = true)]
        min_score: Option<f32>,
    },

    /// Ask questions interactively until `exit` or `quit`
    Chat {
        /// Number of matches per question
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Hide matches scoring below this similarity
        #[arg(long, allow_hyphen_values = true)]
        min_score: Option<f32>,
    },

    /// Show corpus size, embedding model and dimension
    Info,

    /// Delete all cached embeddings
    ClearCache,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
