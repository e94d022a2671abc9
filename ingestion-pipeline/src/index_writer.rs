use std::{sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use serde::Serialize;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{debug, warn};

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::document_chunk::DocumentChunk},
    utils::embedding::EmbeddingProvider,
};

use crate::chunker::SectionChunk;

/// Per-document result of an index write. Embedding failures are partial:
/// the failed chunk ids are reported, the rest of the document is indexed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexWriteOutcome {
    pub indexed: Vec<String>,
    pub failed: Vec<String>,
}

/// Embeds chunks and persists them, plus their multi-section metadata, into
/// the vector index.
pub struct ChunkIndexWriter {
    db: Arc<SurrealDbClient>,
    embedding_provider: Arc<EmbeddingProvider>,
    concurrency: usize,
    embed_timeout: Duration,
}

impl ChunkIndexWriter {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedding_provider: Arc<EmbeddingProvider>,
        concurrency: usize,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            db,
            embedding_provider,
            concurrency: concurrency.max(1),
            embed_timeout,
        }
    }

    /// Delete-then-write for one document is a critical section: old chunks
    /// are cleared before the new set lands, so a re-index never leaves
    /// stale or duplicate chunks behind. Different documents may run
    /// concurrently.
    pub async fn write(
        &self,
        document_id: &str,
        chunks: &[SectionChunk],
    ) -> Result<IndexWriteOutcome, AppError> {
        DocumentChunk::delete_by_document_id(document_id, &self.db)
            .await
            .map_err(|e| {
                AppError::IndexWrite(format!("clearing stale chunks for {document_id}: {e}"))
            })?;

        // Chunk embeddings are independent; bound the in-flight requests.
        let mut embedded: Vec<(usize, Result<Vec<f32>, AppError>)> =
            stream::iter(chunks.iter().enumerate())
                .map(|(idx, chunk)| async move {
                    (idx, self.embed_with_retry(&chunk.text).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        embedded.sort_by_key(|(idx, _)| *idx);

        let mut outcome = IndexWriteOutcome::default();
        for ((_, result), chunk) in embedded.into_iter().zip(chunks) {
            match result {
                Ok(embedding) => {
                    let record = DocumentChunk::new(
                        chunk.chunk_id.clone(),
                        document_id.to_string(),
                        chunk.text.clone(),
                        chunk.token_count,
                        chunk.section_headings.clone(),
                        chunk.section_pages.clone(),
                        chunk.section_bboxes.clone(),
                        embedding,
                    );
                    self.db.store_item(record).await.map_err(|e| {
                        AppError::IndexWrite(format!(
                            "upserting chunk {} for {document_id}: {e}",
                            chunk.chunk_id
                        ))
                    })?;
                    debug!(chunk_id = %chunk.chunk_id, "chunk indexed");
                    outcome.indexed.push(chunk.chunk_id.clone());
                }
                Err(err) => {
                    warn!(
                        chunk_id = %chunk.chunk_id,
                        error = %err,
                        "embedding failed after retries; chunk excluded from index"
                    );
                    outcome.failed.push(chunk.chunk_id.clone());
                }
            }
        }

        Ok(outcome)
    }

    /// Bounded exponential backoff with jitter; a timed-out call counts as a
    /// failed attempt toward the same budget.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);

        Retry::spawn(retry_strategy, || async {
            match tokio::time::timeout(self.embed_timeout, self.embedding_provider.embed(text))
                .await
            {
                Ok(Ok(embedding)) => Ok(embedding),
                Ok(Err(err)) => Err(AppError::EmbeddingTransient(err.to_string())),
                Err(_) => Err(AppError::EmbeddingTransient(format!(
                    "embedding call exceeded {}s",
                    self.embed_timeout.as_secs()
                ))),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::Client;
    use common::storage::types::bounding_box::BoundingBox;
    use uuid::Uuid;

    fn writer_with(db: SurrealDbClient, provider: EmbeddingProvider) -> ChunkIndexWriter {
        ChunkIndexWriter::new(
            Arc::new(db),
            Arc::new(provider),
            4,
            Duration::from_secs(5),
        )
    }

    async fn memory_db() -> SurrealDbClient {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    fn sample_chunks(document_id: &str) -> Vec<SectionChunk> {
        (0..3)
            .map(|i| SectionChunk {
                chunk_id: format!("{document_id}-{i}"),
                text: format!("Heading {i}\n\nBody text for chunk number {i}.\n"),
                token_count: 7,
                section_headings: vec![format!("Heading {i}")],
                section_pages: vec![i + 1],
                section_bboxes: vec![BoundingBox::new(0.0, 0.0, 612.0, 100.0)],
                primary_section: format!("Heading {i}"),
                num_sections: 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_write_indexes_all_chunks() {
        let db = memory_db().await;
        let writer = writer_with(db.clone(), EmbeddingProvider::new_hashed(16));
        let chunks = sample_chunks("doc-a");

        let outcome = writer.write("doc-a", &chunks).await.expect("write failed");

        assert_eq!(outcome.indexed.len(), 3);
        assert!(outcome.failed.is_empty());

        let stored = DocumentChunk::find_by_document_id("doc-a", &db)
            .await
            .expect("query failed");
        assert_eq!(stored.len(), 3);
        for record in &stored {
            assert_eq!(record.embedding.len(), 16);
            assert_eq!(record.num_sections, 1);
        }
    }

    #[tokio::test]
    async fn test_reingestion_replaces_previous_chunks() {
        let db = memory_db().await;
        let writer = writer_with(db.clone(), EmbeddingProvider::new_hashed(16));

        let first = sample_chunks("doc-a");
        writer.write("doc-a", &first).await.expect("write failed");

        // Second run of the same document must not leave stale chunks behind
        let second = sample_chunks("doc-a");
        writer.write("doc-a", &second).await.expect("write failed");

        let stored = DocumentChunk::find_by_document_id("doc-a", &db)
            .await
            .expect("query failed");
        assert_eq!(stored.len(), 3, "chunk count must match a single run");

        let mut texts: Vec<String> = stored.iter().map(|c| c.text.clone()).collect();
        texts.sort();
        let mut expected: Vec<String> = second.iter().map(|c| c.text.clone()).collect();
        expected.sort();
        assert_eq!(texts, expected, "chunk content must match a single run");
    }

    #[tokio::test]
    async fn test_write_scopes_deletion_to_one_document() {
        let db = memory_db().await;
        let writer = writer_with(db.clone(), EmbeddingProvider::new_hashed(16));

        writer
            .write("doc-a", &sample_chunks("doc-a"))
            .await
            .expect("write failed");
        writer
            .write("doc-b", &sample_chunks("doc-b"))
            .await
            .expect("write failed");
        writer
            .write("doc-a", &sample_chunks("doc-a"))
            .await
            .expect("write failed");

        let doc_b = DocumentChunk::find_by_document_id("doc-b", &db)
            .await
            .expect("query failed");
        assert_eq!(doc_b.len(), 3, "re-indexing doc-a must not touch doc-b");
    }

    #[tokio::test]
    async fn test_unreachable_embedding_service_reports_partial_failure() {
        let db = memory_db().await;
        // Point the OpenAI backend at a closed port: every attempt fails
        // fast, exhausting the retry budget.
        let config = async_openai::config::OpenAIConfig::new()
            .with_api_base("http://127.0.0.1:9")
            .with_api_key("test-key");
        let provider = EmbeddingProvider::new_openai(
            Arc::new(Client::with_config(config)),
            "text-embedding-3-small".to_string(),
            16,
        );
        let writer = writer_with(db.clone(), provider);
        let chunks = sample_chunks("doc-a");

        let outcome = writer.write("doc-a", &chunks).await.expect("write failed");

        assert!(outcome.indexed.is_empty());
        assert_eq!(outcome.failed.len(), 3);
        let stored = DocumentChunk::find_by_document_id("doc-a", &db)
            .await
            .expect("query failed");
        assert!(stored.is_empty(), "failed chunks must not be indexed");
    }

    #[tokio::test]
    async fn test_write_with_no_chunks_clears_document() {
        let db = memory_db().await;
        let writer = writer_with(db.clone(), EmbeddingProvider::new_hashed(16));

        writer
            .write("doc-a", &sample_chunks("doc-a"))
            .await
            .expect("write failed");
        let outcome = writer.write("doc-a", &[]).await.expect("write failed");

        assert!(outcome.indexed.is_empty());
        assert!(outcome.failed.is_empty());
        let stored = DocumentChunk::find_by_document_id("doc-a", &db)
            .await
            .expect("query failed");
        assert!(stored.is_empty());
    }
}
