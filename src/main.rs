// SPDX-License-Identifier: MIT OR Apache-2.0

//! faqseek - Local semantic FAQ lookup
//!
//! Embeds FAQ questions once at start-up and answers queries with the
//! top-K most cosine-similar entries.

mod cli;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, OutputFormat};
use colored::Colorize;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use faqseek::config::{Config, ConfigOutputFormat};
use faqseek::embedding::{create_provider, EmbeddingCache};
use faqseek::engine::FaqEngine;
use faqseek::errors::RetrievalError;
use faqseek::faq::load_faq;
use faqseek::output::{use_colors, write_matches};
use faqseek::session::{run_session, SessionOptions};

fn main() -> Result<()> {
    // Initialize tracing with FAQSEEK_LOG env var (e.g., FAQSEEK_LOG=debug faqseek chat)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FAQSEEK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let format = match cli.format {
        Some(OutputFormat::Json) => ConfigOutputFormat::Json,
        Some(OutputFormat::Text) => ConfigOutputFormat::Text,
        None => config.output_format().unwrap_or_default(),
    };
    let use_color = use_colors() && format == ConfigOutputFormat::Text;

    match cli.command {
        Commands::Ask {
            query,
            top_k,
            min_score,
        } => {
            let k = resolve_top_k(&config, top_k)?;
            let mut engine = build_engine(&config, cli.faq, cli.no_cache)?;
            let matches = engine.ask_above(&query, k, config.merge_min_score(min_score))?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_matches(&mut out, &matches, format, use_color)?;
        }
        Commands::Chat { top_k, min_score } => {
            let top_k = resolve_top_k(&config, top_k)?;
            let mut engine = build_engine(&config, cli.faq, cli.no_cache)?;
            let options = SessionOptions {
                top_k,
                min_score: config.merge_min_score(min_score),
                format,
                use_color,
            };

            let stdin = io::stdin();
            let stdout = io::stdout();
            run_session(&mut engine, stdin.lock(), stdout.lock(), options)?;
        }
        Commands::Info => {
            let faq_path = config.merge_faq_path(cli.faq.clone());
            let engine = build_engine(&config, cli.faq, cli.no_cache)?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            match format {
                ConfigOutputFormat::Json => {
                    let info = serde_json::json!({
                        "faq_path": faq_path.display().to_string(),
                        "entries": engine.len(),
                        "model": engine.model_id(),
                        "dimension": engine.dimension(),
                    });
                    writeln!(out, "{}", info)?;
                }
                ConfigOutputFormat::Text => {
                    writeln!(out, "FAQ file:  {}", faq_path.display())?;
                    writeln!(out, "Entries:   {}", engine.len())?;
                    writeln!(out, "Model:     {}", engine.model_id())?;
                    writeln!(out, "Dimension: {}", engine.dimension())?;
                }
            }
        }
        Commands::ClearCache => {
            let cache = open_cache(&config)?;
            let removed = cache.count()?;
            cache.clear()?;
            let message = format!(
                "Removed {} cached embeddings from {}",
                removed,
                cache.path().display()
            );
            if use_color {
                println!("{}", message.green());
            } else {
                println!("{}", message);
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "faqseek", &mut io::stdout());
        }
    }

    Ok(())
}

/// Effective K for `ask` and `chat`, rejected before any embedding work.
fn resolve_top_k(config: &Config, flag: Option<usize>) -> Result<usize> {
    let k = config.merge_top_k(flag);
    if k == 0 {
        return Err(RetrievalError::InvalidTopK { k }.into());
    }
    Ok(k)
}

fn build_engine(
    config: &Config,
    faq_override: Option<std::path::PathBuf>,
    no_cache: bool,
) -> Result<FaqEngine> {
    let faq_path = config.merge_faq_path(faq_override);
    let entries = load_faq(&faq_path)?;
    tracing::debug!(path = %faq_path.display(), entries = entries.len(), "loaded FAQ");

    let provider = create_provider(config.embeddings())?;

    let cache = if !no_cache && config.cache().enabled() {
        match open_cache(config) {
            Ok(cache) => Some(cache),
            Err(err) => {
                tracing::warn!("embedding cache unavailable: {:#}", err);
                None
            }
        }
    } else {
        None
    };

    FaqEngine::build(entries, provider, cache.as_ref())
        .with_context(|| format!("Failed to prepare FAQ data from {}", faq_path.display()))
}

fn open_cache(config: &Config) -> Result<EmbeddingCache> {
    match config.cache().path() {
        Some(path) => EmbeddingCache::open(path),
        None => EmbeddingCache::open_default(),
    }
}
