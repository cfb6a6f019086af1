// file: src/pipeline/builder.rs
// description: shared index construction from the data directory
// reference: load, chunk, embed, and insert in one reusable component

use crate::config::Config;
use crate::error::Result;
use crate::index::{ChunkInserter, LanceDbClient, SchemaManager};
use crate::knowledge::{DirectoryReader, LoadedDocument, MarkdownExtractor, TextChunker};
use crate::models::Chunk;
use crate::pipeline::progress::ProgressTracker;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Builds the chunk index from the configured data directory. The voice
/// application shell and the ingest command construct the index through this
/// one component.
pub struct IndexBuilder {
    config: Config,
    extractor: MarkdownExtractor,
    chunker: TextChunker,
}

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub documents_loaded: usize,
    pub chunks_indexed: usize,
    pub batches_failed: usize,
    pub duration_secs: f64,
}

impl IndexBuilder {
    pub fn new(config: Config) -> Self {
        let chunker = TextChunker::new(config.knowledge.chunk_size);
        Self {
            config,
            extractor: MarkdownExtractor::new(),
            chunker,
        }
    }

    /// Ensure an index exists: builds it only when the chunk table is empty.
    /// Used by application setup so a pre-ingested index is not rebuilt.
    pub async fn ensure_index(&self, client: &LanceDbClient) -> Result<IngestStats> {
        let existing = client.get_chunk_count().await?;
        if existing > 0 {
            info!("Index already holds {} chunks, skipping build", existing);
            return Ok(IngestStats::default());
        }
        self.build(client, false, None).await
    }

    /// Build the index: load documents, chunk them, embed and insert.
    /// `force` drops any existing table first; `limit` caps the number of
    /// documents processed.
    pub async fn build(
        &self,
        client: &LanceDbClient,
        force: bool,
        limit: Option<usize>,
    ) -> Result<IngestStats> {
        let start_time = Instant::now();

        if force {
            let schema_manager = SchemaManager::new(client);
            schema_manager.drop_all_tables().await?;
        }

        let reader = DirectoryReader::new(self.config.knowledge.clone());
        let documents = reader.load_documents()?;

        let documents = match limit {
            Some(limit) => documents.into_iter().take(limit).collect(),
            None => documents,
        };

        info!("Chunking {} documents", documents.len());

        let mut chunks = Vec::new();
        for document in &documents {
            chunks.extend(self.chunk_document(document)?);
        }

        if chunks.is_empty() {
            warn!("No chunks produced from data directory");
            return Ok(IngestStats {
                documents_loaded: documents.len(),
                duration_secs: start_time.elapsed().as_secs_f64(),
                ..Default::default()
            });
        }

        info!("Indexing {} chunks", chunks.len());

        let batch_size = client.batch_size().max(1);
        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        let tracker = ProgressTracker::new(batches.len());
        let mut batch_iter = batches.into_iter();

        // First batch goes in alone so table creation never races
        let mut chunks_indexed = 0;
        let mut batches_failed = 0;

        if let Some(first) = batch_iter.next() {
            let inserter = ChunkInserter::new(client);
            match inserter.insert_chunks(&first).await {
                Ok(count) => {
                    chunks_indexed += count;
                    tracker.inc_batches_done();
                    tracker.add_chunks(count);
                }
                Err(e) => {
                    error!("Failed to insert first batch: {}", e);
                    tracker.inc_batches_failed();
                    return Err(e);
                }
            }
        }

        let client = Arc::new(client.clone());
        let parallel_workers = self.config.knowledge.parallel_workers.max(1);

        let results = stream::iter(batch_iter.map(|batch| {
            let client = Arc::clone(&client);
            async move {
                let inserter = ChunkInserter::new(client.as_ref());
                let size = batch.len();
                (inserter.insert_chunks(&batch).await, size)
            }
        }))
        .buffer_unordered(parallel_workers)
        .collect::<Vec<_>>()
        .await;

        for (result, size) in results {
            match result {
                Ok(count) => {
                    chunks_indexed += count;
                    tracker.inc_batches_done();
                    tracker.add_chunks(count);
                }
                Err(e) => {
                    error!("Failed to insert batch of {}: {}", size, e);
                    tracker.inc_batches_failed();
                    batches_failed += 1;
                }
            }
        }

        tracker.finish();

        let stats = IngestStats {
            documents_loaded: documents.len(),
            chunks_indexed,
            batches_failed,
            duration_secs: start_time.elapsed().as_secs_f64(),
        };

        info!(
            "Ingestion complete: {} documents, {} chunks in {:.2}s",
            stats.documents_loaded, stats.chunks_indexed, stats.duration_secs
        );

        Ok(stats)
    }

    /// Chunk one loaded document. Markdown files are reduced to plain text
    /// first when `strip_markdown` is enabled; the document title (heading or
    /// frontmatter) is carried onto every chunk.
    fn chunk_document(&self, document: &LoadedDocument) -> Result<Vec<Chunk>> {
        let is_markdown = matches!(
            document
                .path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
            Some(ref ext) if ext == "md" || ext == "markdown"
        );

        let (title, text) = if is_markdown && self.config.knowledge.strip_markdown {
            let extracted = self.extractor.extract(&document.content)?;
            (
                document.title.clone().or(extracted.title),
                extracted.text,
            )
        } else {
            (document.title.clone(), document.content.clone())
        };

        let chunks = self
            .chunker
            .chunk(&text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                Chunk::new(
                    document.path.display().to_string(),
                    document.relative_path.clone(),
                    i as u32,
                    content,
                )
                .with_title(title.clone())
            })
            .collect();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> Config {
        let mut config = Config::default_config();
        config.knowledge.data_dir = temp.path().join("data");
        config.knowledge.parallel_workers = 2;
        config.database.uri = temp.path().join("lancedb").to_string_lossy().to_string();
        config.database.embedding_dim = 16;
        config.database.batch_size = 2;
        config
    }

    #[tokio::test]
    async fn test_build_indexes_documents() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(
            data_dir.join("policy.md"),
            "# Refund Policy\n\nRefunds are accepted within 30 days of purchase.",
        )
        .unwrap();
        fs::write(data_dir.join("notes.txt"), "Support hours are 9 to 5.").unwrap();

        let config = test_config(&temp);
        let client = LanceDbClient::new(config.database.clone()).await.unwrap();
        let builder = IndexBuilder::new(config);

        let stats = builder.build(&client, false, None).await.unwrap();

        assert_eq!(stats.documents_loaded, 2);
        assert!(stats.chunks_indexed >= 2);
        assert_eq!(stats.batches_failed, 0);
        assert_eq!(client.get_chunk_count().await.unwrap(), stats.chunks_indexed as u64);
    }

    #[tokio::test]
    async fn test_ensure_index_skips_populated_table() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("doc.md"), "# Doc\n\nSome content here.").unwrap();

        let config = test_config(&temp);
        let client = LanceDbClient::new(config.database.clone()).await.unwrap();
        let builder = IndexBuilder::new(config);

        let first = builder.ensure_index(&client).await.unwrap();
        assert!(first.chunks_indexed > 0);

        let second = builder.ensure_index(&client).await.unwrap();
        assert_eq!(second.chunks_indexed, 0);
        assert_eq!(second.documents_loaded, 0);
    }

    #[tokio::test]
    async fn test_build_missing_data_dir_fails() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let client = LanceDbClient::new(config.database.clone()).await.unwrap();
        let builder = IndexBuilder::new(config);

        assert!(builder.build(&client, false, None).await.is_err());
    }

    #[test]
    fn test_chunking_is_deterministic_for_fixed_size() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let builder = IndexBuilder::new(config);

        let document = LoadedDocument {
            path: std::path::PathBuf::from("/kb/doc.md"),
            relative_path: "doc.md".to_string(),
            content: "# Title\n\nFirst paragraph of content.\n\nSecond paragraph here."
                .to_string(),
            title: None,
            size: 64,
            modified: 0,
        };

        let first: Vec<String> = builder
            .chunk_document(&document)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        let second: Vec<String> = builder
            .chunk_document(&document)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();

        assert_eq!(first, second);
    }
}
