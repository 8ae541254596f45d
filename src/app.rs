//! Wiring from a [`Config`] to the store and the assistant.
//!
//! The index is in-memory, so every process builds it from `[docs].root`
//! at startup.

use std::sync::Arc;

use anyhow::Result;
use coursemate_core::index::memory::InMemoryIndex;
use tracing::info;

use crate::assistant::CourseAssistant;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::ingest::{ingest_folder, IngestSummary};
use crate::llm::anthropic::AnthropicModel;
use crate::llm::GenerationModel;
use crate::session::SessionStore;
use crate::store::CourseStore;
use crate::traits::ToolRegistry;

/// Build an empty store backed by the configured embedder.
pub fn build_store(config: &Config) -> Result<Arc<CourseStore>> {
    let embedder = create_embedder(&config.embedding)?;
    let index = InMemoryIndex::new(embedder);
    info!(model = index.model_name(), "embedding model ready");
    Ok(Arc::new(CourseStore::new(
        Arc::new(index),
        config.retrieval.max_results,
    )))
}

/// Build a store and load every course under `[docs].root` into it.
pub async fn load_store(config: &Config) -> Result<(Arc<CourseStore>, IngestSummary)> {
    let store = build_store(config)?;
    let summary = ingest_folder(&store, &config.docs, &config.chunking).await?;
    info!(
        courses = summary.courses_added,
        chunks = summary.chunks_added,
        skipped = summary.skipped,
        "course ingestion finished"
    );
    Ok((store, summary))
}

/// Assemble an assistant around an already loaded store.
pub fn build_assistant(
    config: &Config,
    store: Arc<CourseStore>,
    model: Arc<dyn GenerationModel>,
) -> Arc<CourseAssistant> {
    Arc::new(CourseAssistant::new(
        model,
        store,
        Arc::new(ToolRegistry::with_builtins()),
        Arc::new(SessionStore::new(config.session.max_history)),
        config.generation.max_tool_rounds,
    ))
}

/// Load courses and connect to the configured generation model.
pub async fn bootstrap(config: &Config) -> Result<Arc<CourseAssistant>> {
    let (store, _) = load_store(config).await?;
    let model = Arc::new(AnthropicModel::new(&config.generation)?);
    Ok(build_assistant(config, store, model))
}
