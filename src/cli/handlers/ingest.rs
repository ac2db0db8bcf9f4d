//! Reference corpus ingestion handler

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::*;
use crate::embeddings::EmbeddingClient;
use crate::index::QdrantIndex;
use crate::ingest::ingest_references;
use crate::ingest::load_reference_items;
use crate::AppConfig;
use crate::Result;

pub async fn handle_ingest_command(
    config: &AppConfig,
    file: PathBuf,
    concurrency: usize,
) -> Result<()> {
    let items = load_reference_items(&file)?;
    print_info(&format!(
        "Loaded {} reference items from {}",
        items.len(),
        file.display()
    ));

    let embedder = Arc::new(EmbeddingClient::from_app_config(config)?);
    let index = Arc::new(QdrantIndex::from_app_config(config)?);

    let stats = ingest_references(
        items,
        embedder,
        index,
        config.embedding_dimension(),
        concurrency,
    )
    .await?;

    print_ingest_stats(&stats);
    if stats.failed > 0 {
        print_warning("Some items failed to embed; see the log for details");
    }

    Ok(())
}
