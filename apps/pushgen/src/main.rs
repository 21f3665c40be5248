mod config;
mod errors;
mod features;
mod ingest;
mod llm_client;
mod models;
mod notification;
mod pipeline;
mod report;
mod scoring;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Backend, Config};
use crate::llm_client::{LlmClient, TextGenerator};
use crate::notification::generator::{GeneratorSettings, NotificationGenerator};
use crate::pipeline::Pipeline;
use crate::scoring::rules::BenefitRates;
use crate::scoring::scorer::RuleBasedScorer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on bad flags or a missing API key)
    let config = Config::load()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pushgen v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the generation backend (None = templates only)
    let backend: Option<Arc<dyn TextGenerator>> = match config.backend {
        Backend::Llm => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .context("ANTHROPIC_API_KEY is required for the llm backend")?;
            let llm = LlmClient::new(api_key, config.model.clone(), config.timeout, config.max_retries)
                .context("failed to build the LLM client")?;
            info!("LLM client initialized (model: {})", llm.model());
            Some(Arc::new(llm))
        }
        Backend::Template => {
            info!("Template backend selected, no network calls");
            None
        }
    };

    let settings = GeneratorSettings {
        max_chars: config.max_chars,
        attempts: config.generation_attempts,
        fallback: config.fallback,
        fail_fast: config.fail_fast,
    };

    let pipeline = Pipeline::new(
        Arc::new(RuleBasedScorer::new(BenefitRates::default())),
        NotificationGenerator::new(backend, settings),
        config.max_chars,
    );

    let summary = pipeline
        .run(&config.data_dir, &config.out_dir)
        .await
        .context("pipeline failed")?;

    println!("{summary}");
    Ok(())
}
