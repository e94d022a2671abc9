use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::document_chunk::DocumentChunk},
    utils::embedding::EmbeddingProvider,
};
use serde::Deserialize;
use tracing::debug;

use crate::{scoring::distance_to_similarity, ScoredChunk};

#[derive(Debug, Deserialize)]
struct ChunkWithDistance {
    #[serde(flatten)]
    chunk: DocumentChunk,
    distance: f32,
}

/// Embeds the query and retrieves the closest chunks from the vector index,
/// carrying the section metadata the reranker consumes.
pub async fn find_chunks_by_vector_similarity(
    take: u8,
    input_text: &str,
    db_client: &SurrealDbClient,
    embedding_provider: &EmbeddingProvider,
) -> Result<Vec<ScoredChunk>, AppError> {
    let input_embedding = embedding_provider.embed(input_text).await?;
    find_chunks_with_embedding(take, &input_embedding, db_client).await
}

/// Same search with a precomputed query vector.
pub async fn find_chunks_with_embedding(
    take: u8,
    query_embedding: &[f32],
    db_client: &SurrealDbClient,
) -> Result<Vec<ScoredChunk>, AppError> {
    let closest_query = format!(
        "SELECT *, vector::distance::knn() AS distance FROM document_chunk WHERE embedding <|{},40|> {:?} ORDER BY distance",
        take, query_embedding
    );

    let mut response = db_client.query(closest_query).await?;
    let rows: Vec<ChunkWithDistance> = response.take(0)?;

    debug!(candidates = rows.len(), "vector search finished");

    Ok(rows
        .into_iter()
        .map(|row| {
            ScoredChunk::new(
                row.chunk.id,
                distance_to_similarity(row.distance),
                row.chunk.section_headings,
            )
        })
        .collect())
}
