pub mod reranker;
pub mod scoring;
pub mod search;

use serde::{Deserialize, Serialize};

pub use reranker::rerank;
pub use search::{find_chunks_by_vector_similarity, find_chunks_with_embedding};

/// A retrieval candidate: the similarity score from the vector index plus
/// the section metadata stored alongside the chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score: f32,
    pub section_headings: Vec<String>,
}

impl ScoredChunk {
    pub fn new(chunk_id: String, score: f32, section_headings: Vec<String>) -> Self {
        Self {
            chunk_id,
            score,
            section_headings,
        }
    }
}
