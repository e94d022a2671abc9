use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::{debug, warn};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            chunk_ref::ChunkRef,
            document::Document,
            provenance_edge::{ContainsChunkEdge, HasSectionEdge},
            section_node::SectionNode,
        },
    },
};

use crate::{chunker::SectionChunk, structure::Section};

/// Counts of `contains_chunk` linkage writes for one document. The graph is
/// enrichment, not primary storage: failures are tallied, never fatal.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GraphWriteOutcome {
    pub links_created: usize,
    pub links_failed: usize,
}

/// Persists the `Document -> Section -> Chunk` hierarchy into the graph
/// store. A chunk spanning N sections receives N inbound `contains_chunk`
/// edges, one per contributing section node.
pub struct GraphProvenanceBuilder {
    db: Arc<SurrealDbClient>,
}

impl GraphProvenanceBuilder {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    pub async fn build(
        &self,
        document_id: &str,
        sections: &[Section],
        chunks: &[SectionChunk],
    ) -> Result<GraphWriteOutcome, AppError> {
        self.clear_previous(document_id).await?;

        Document::new(
            document_id.to_string(),
            document_id.to_string(),
            sections.len(),
        )
        .replace(&self.db)
        .await?;

        let section_nodes = self.store_section_nodes(document_id, sections).await;
        let outcome = self
            .link_chunks(document_id, &section_nodes, chunks)
            .await;

        debug!(
            document_id,
            sections = sections.len(),
            links_created = outcome.links_created,
            links_failed = outcome.links_failed,
            "graph provenance written"
        );

        Ok(outcome)
    }

    /// Stale nodes and edges from a previous ingestion of the same document
    /// are removed first; a partial graph left by an earlier failure gets
    /// reconciled here.
    async fn clear_previous(&self, document_id: &str) -> Result<(), AppError> {
        ContainsChunkEdge::delete_by_document_id(document_id, &self.db).await?;
        HasSectionEdge::delete_by_document_id(document_id, &self.db).await?;
        ChunkRef::delete_by_document_id(document_id, &self.db).await?;
        SectionNode::delete_by_document_id(document_id, &self.db).await?;
        Ok(())
    }

    async fn store_section_nodes(
        &self,
        document_id: &str,
        sections: &[Section],
    ) -> Vec<SectionNode> {
        let mut nodes = Vec::with_capacity(sections.len());
        for (order, section) in sections.iter().enumerate() {
            let node =
                SectionNode::new(document_id, section.heading.clone(), section.page_no, order);
            if let Err(err) = self.db.store_item(node.clone()).await {
                warn!(
                    section = %node.id,
                    error = %err,
                    "storing section node failed; dependent chunk links will be skipped"
                );
                continue;
            }
            if let Err(err) =
                HasSectionEdge::new(document_id.to_string(), node.id.clone(), order)
                    .store(&self.db)
                    .await
            {
                warn!(section = %node.id, error = %err, "linking section to document failed");
            }
            nodes.push(node);
        }
        nodes
    }

    async fn link_chunks(
        &self,
        document_id: &str,
        section_nodes: &[SectionNode],
        chunks: &[SectionChunk],
    ) -> GraphWriteOutcome {
        // Repeated headings resolve to the first unconsumed section node in
        // document order; the cursor advances per heading.
        let mut nodes_by_heading: HashMap<&str, Vec<&SectionNode>> = HashMap::new();
        for node in section_nodes {
            nodes_by_heading
                .entry(node.heading.as_str())
                .or_default()
                .push(node);
        }
        let mut cursors: HashMap<&str, usize> = HashMap::new();

        let mut outcome = GraphWriteOutcome::default();
        for chunk in chunks {
            if let Err(err) = self
                .db
                .store_item(ChunkRef::new(
                    chunk.chunk_id.clone(),
                    document_id.to_string(),
                    chunk.token_count,
                ))
                .await
            {
                warn!(chunk_id = %chunk.chunk_id, error = %err, "storing chunk node failed");
                outcome.links_failed += chunk.num_sections;
                continue;
            }

            for heading in &chunk.section_headings {
                let cursor = cursors.entry(heading.as_str()).or_insert(0);
                let node = nodes_by_heading
                    .get(heading.as_str())
                    .and_then(|nodes| nodes.get(*cursor));

                match node {
                    Some(node) => {
                        *cursor += 1;
                        let edge = ContainsChunkEdge::new(
                            document_id.to_string(),
                            node.id.clone(),
                            chunk.chunk_id.clone(),
                        );
                        match edge.store(&self.db).await {
                            Ok(()) => outcome.links_created += 1,
                            Err(err) => {
                                warn!(
                                    chunk_id = %chunk.chunk_id,
                                    section = %node.id,
                                    error = %err,
                                    "chunk linkage write failed; skipping"
                                );
                                outcome.links_failed += 1;
                            }
                        }
                    }
                    None => {
                        warn!(
                            chunk_id = %chunk.chunk_id,
                            heading = %heading,
                            "no unconsumed section node for heading; skipping link"
                        );
                        outcome.links_failed += 1;
                    }
                }
            }
        }
        outcome
    }
}
