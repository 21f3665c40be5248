use std::path::PathBuf;

use thiserror::Error;

/// Pipeline-level error type.
/// Every variant here is fatal for the run; per-row and per-client problems are
/// recorded in the data-quality report or handled by the fallback policy instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing input '{source_name}': none of {} exists", display_paths(.tried))]
    MissingInput {
        source_name: &'static str,
        tried: Vec<PathBuf>,
    },

    #[error("Missing column in {file}: expected one of {aliases:?}, found {found:?}")]
    MissingColumn {
        file: String,
        aliases: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("Generation failed for client {client_id} (fail-fast mode): {source}")]
    Generation {
        client_id: String,
        #[source]
        source: crate::llm_client::GenerationError,
    },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
