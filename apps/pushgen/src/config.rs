use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::llm_client::DEFAULT_MODEL;

/// Where message text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Anthropic Messages API.
    Llm,
    /// Deterministic templates, no network.
    Template,
}

/// What happens to a client whose generation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Use the deterministic template text.
    Template,
    /// Leave the client out of the submission and list it in excluded.csv.
    Exclude,
}

/// Command line flags. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "pushgen", version, about = "Personalized push notifications from bank activity")]
pub struct Cli {
    /// Directory with clients.csv, transactions.csv and transfers.csv
    #[arg(long, env = "PUSHGEN_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Output directory, created if missing
    #[arg(long, env = "PUSHGEN_OUT_DIR", default_value = "output")]
    pub out_dir: PathBuf,

    #[arg(long, env = "PUSHGEN_BACKEND", value_enum, default_value_t = Backend::Llm)]
    pub backend: Backend,

    #[arg(long, env = "PUSHGEN_FALLBACK", value_enum, default_value_t = FallbackPolicy::Template)]
    pub fallback: FallbackPolicy,

    /// Abort the run on the first generation failure
    #[arg(long, env = "PUSHGEN_FAIL_FAST", default_value_t = false)]
    pub fail_fast: bool,

    /// Maximum message length in characters
    #[arg(long, env = "PUSHGEN_MAX_CHARS", default_value_t = 220)]
    pub max_chars: usize,

    /// Per-call timeout for the generation service
    #[arg(long, env = "PUSHGEN_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Retries after a failed generation call (429/5xx/timeouts)
    #[arg(long, env = "PUSHGEN_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Re-asks after a reply that breaks the message rules
    #[arg(long, env = "PUSHGEN_GENERATION_ATTEMPTS", default_value_t = 2)]
    pub generation_attempts: u32,

    #[arg(long, env = "PUSHGEN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
}

/// Run configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub backend: Backend,
    pub fallback: FallbackPolicy,
    pub fail_fast: bool,
    pub max_chars: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    pub generation_attempts: u32,
    pub model: String,
    /// Present only for the `llm` backend.
    pub anthropic_api_key: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        anyhow::ensure!(cli.max_chars > 0, "--max-chars must be positive");
        anyhow::ensure!(
            cli.generation_attempts > 0,
            "--generation-attempts must be at least 1"
        );

        let anthropic_api_key = match cli.backend {
            Backend::Llm => Some(require_env("ANTHROPIC_API_KEY")?),
            Backend::Template => None,
        };

        Ok(Config {
            data_dir: cli.data_dir,
            out_dir: cli.out_dir,
            backend: cli.backend,
            fallback: cli.fallback,
            fail_fast: cli.fail_fast,
            max_chars: cli.max_chars,
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            max_retries: cli.max_retries,
            generation_attempts: cli.generation_attempts,
            model: cli.model,
            anthropic_api_key,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}
