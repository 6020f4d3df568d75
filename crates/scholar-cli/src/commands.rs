//! Subcommand implementations.
//!
//! Every command that touches the index builds a fresh [`RetrievalEngine`]
//! over the resolved data directory; `log` only appends to the conversation
//! log and never loads the model.

use crate::config::Settings;
use crate::output;
use anyhow::{anyhow, Context, Result};
use scholar_core::storage::NativeStorage;
use scholar_core::{ConversationLog, RetrievalEngine};
use std::path::Path;
use tracing::{info, warn};

fn open_engine(settings: &Settings) -> Result<RetrievalEngine<NativeStorage>> {
    let embedder = settings.load_embedder()?;
    RetrievalEngine::open(settings.engine_config(), embedder)
        .with_context(|| format!("Failed to open index in {}", settings.data_dir.display()))
}

/// Loads the index and brings it up to date with the data directory.
pub async fn init(settings: &Settings, json: bool) -> Result<String> {
    tokio::fs::create_dir_all(&settings.data_dir)
        .await
        .with_context(|| format!("Failed to create {}", settings.data_dir.display()))?;

    let engine = open_engine(settings)?;
    let report = engine
        .initialize()
        .await
        .context("Failed to initialize index")?;

    Ok(if json {
        output::to_json(&report)
    } else {
        output::format_init(&report)
    })
}

/// Searches the existing index without re-indexing.
pub async fn search(
    settings: &Settings,
    query: &str,
    limit: usize,
    json: bool,
    context: bool,
) -> Result<String> {
    let engine = open_engine(settings)?;

    let load = engine.load().await;
    if let Some(reason) = load.discarded {
        warn!("Existing index could not be used: {}", reason);
    }
    if load.restored_chunks == 0 {
        return Err(anyhow!(
            "Index in {} is empty. Run `scholar init` first.",
            settings.data_dir.display()
        ));
    }
    info!("Loaded index with {} chunks", load.restored_chunks);

    let hits = engine
        .search(query, limit)
        .await
        .with_context(|| format!("Search failed for \"{}\"", query))?;

    Ok(if context {
        scholar_core::format_context(&hits)
    } else if json {
        output::format_json(query, &hits)
    } else {
        output::format_human(query, &hits)
    })
}

/// Saves a note into the data directory and indexes it.
pub async fn note(
    settings: &Settings,
    title: &str,
    id: &str,
    content: Option<&str>,
    file: Option<&Path>,
) -> Result<String> {
    let content = match (content, file) {
        (Some(content), _) => content.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read note file {}", path.display()))?,
        (None, None) => return Err(anyhow!("Either --content or --file is required")),
    };

    let engine = open_engine(settings)?;
    let report = engine
        .index_inline_text(title, &content, id)
        .await
        .with_context(|| format!("Failed to index note {}", id))?;

    Ok(output::format_ingest(&report))
}

/// Appends one exchange to the conversation log.
pub async fn log(settings: &Settings, user: &str, assistant: &str, model: &str) -> Result<String> {
    let log = ConversationLog::new(settings.engine_config().history_path());
    log.append(user, assistant, model)
        .await
        .with_context(|| format!("Failed to append to {}", log.path().display()))?;

    Ok(format!(
        "Appended to {}; run `scholar init` to index it",
        log.path().display()
    ))
}

/// Shows what the persisted index contains.
pub async fn status(settings: &Settings, json: bool) -> Result<String> {
    let engine = open_engine(settings)?;
    let load = engine.load().await;
    if let Some(reason) = &load.discarded {
        warn!("Existing index could not be used: {}", reason);
    }

    let stats = engine.stats().await;
    Ok(if json {
        output::to_json(&stats)
    } else {
        output::format_status(&stats)
    })
}
