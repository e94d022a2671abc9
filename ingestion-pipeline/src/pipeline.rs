use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{info, instrument, warn};

use common::{
    error::AppError,
    storage::db::SurrealDbClient,
    utils::{config::AppConfig, embedding::EmbeddingProvider, tokens::TokenCounter},
};

use crate::{
    chunker::{AdaptiveSectionChunker, ChunkerConfig},
    index_writer::ChunkIndexWriter,
    provenance::{GraphProvenanceBuilder, GraphWriteOutcome},
    structure::{extract_sections, Block},
};

/// Operator-facing summary of one document's ingestion: whether the chunking
/// logic ran correctly is distinguishable from storage partially failing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub chunks_created: usize,
    pub chunks_indexed: usize,
    pub chunks_failed: usize,
    pub failed_chunk_ids: Vec<String>,
    pub graph_links_created: usize,
    pub graph_links_failed: usize,
}

/// Per-document ingestion: structure extraction, adaptive chunking, then a
/// fan-out write into the vector index and the provenance graph.
pub struct IngestionPipeline {
    chunker: AdaptiveSectionChunker,
    token_counter: TokenCounter,
    index_writer: ChunkIndexWriter,
    provenance: GraphProvenanceBuilder,
    db: Arc<SurrealDbClient>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedding_provider: Arc<EmbeddingProvider>,
        token_counter: TokenCounter,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let chunker = AdaptiveSectionChunker::new(ChunkerConfig::from_app_config(config))?;
        let index_writer = ChunkIndexWriter::new(
            Arc::clone(&db),
            embedding_provider,
            config.embed_concurrency,
            Duration::from_secs(config.embed_timeout_secs),
        );
        let provenance = GraphProvenanceBuilder::new(Arc::clone(&db));

        Ok(Self {
            chunker,
            token_counter,
            index_writer,
            provenance,
            db,
        })
    }

    /// Documents are independent: callers may run this concurrently for
    /// different document ids. For one id, the call is the critical section.
    #[instrument(skip_all, fields(document_id))]
    pub async fn ingest_document(
        &self,
        document_id: &str,
        blocks: &[Block],
    ) -> Result<IngestionReport, AppError> {
        // Extraction and chunking are pure and cheap: all-or-nothing,
        // no partial results for a single document.
        let sections = extract_sections(blocks, &self.token_counter)?;
        let chunks = self.chunker.chunk(document_id, &sections);
        let chunks_created = chunks.len();

        // Independent stores, no ordering dependency between them.
        let (index_result, graph_result) = tokio::join!(
            self.index_writer.write(document_id, &chunks),
            self.provenance.build(document_id, &sections, &chunks),
        );

        let index_outcome = index_result?;
        let graph_outcome = match graph_result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    %document_id,
                    error = %err,
                    "graph provenance write failed; index remains authoritative"
                );
                GraphWriteOutcome {
                    links_created: 0,
                    links_failed: chunks.iter().map(|c| c.num_sections).sum(),
                }
            }
        };

        self.db.rebuild_indexes().await?;

        let report = IngestionReport {
            chunks_created,
            chunks_indexed: index_outcome.indexed.len(),
            chunks_failed: index_outcome.failed.len(),
            failed_chunk_ids: index_outcome.failed,
            graph_links_created: graph_outcome.links_created,
            graph_links_failed: graph_outcome.links_failed,
        };
        info!(
            %document_id,
            chunks_created = report.chunks_created,
            chunks_indexed = report.chunks_indexed,
            chunks_failed = report.chunks_failed,
            graph_links_created = report.graph_links_created,
            graph_links_failed = report.graph_links_failed,
            "document ingested"
        );

        Ok(report)
    }
}
