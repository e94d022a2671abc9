use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::bounding_box::BoundingBox;

// Vector-index payload: the retrievable text plus the multi-section metadata
// that downstream reranking and citation rely on. The embedding is stored
// inline so the HNSW index covers it.
stored_object!(DocumentChunk, "document_chunk", {
    document_id: String,
    text: String,
    token_count: usize,
    section_headings: Vec<String>,
    section_pages: Vec<u32>,
    section_bboxes: Vec<BoundingBox>,
    primary_section: String,
    num_sections: usize,
    embedding: Vec<f32>
});

impl DocumentChunk {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chunk_id: String,
        document_id: String,
        text: String,
        token_count: usize,
        section_headings: Vec<String>,
        section_pages: Vec<u32>,
        section_bboxes: Vec<BoundingBox>,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        let primary_section = section_headings.first().cloned().unwrap_or_default();
        let num_sections = section_headings.len();
        Self {
            id: chunk_id,
            created_at: now,
            updated_at: now,
            document_id,
            text,
            token_count,
            section_headings,
            section_pages,
            section_bboxes,
            primary_section,
            num_sections,
            embedding,
        }
    }

    pub async fn delete_by_document_id(
        document_id: &str,
        db_client: &SurrealDbClient,
    ) -> Result<(), AppError> {
        let query = format!(
            "DELETE {} WHERE document_id = '{}'",
            Self::table_name(),
            document_id
        );
        db_client.query(query).await?;

        Ok(())
    }

    pub async fn find_by_document_id(
        document_id: &str,
        db_client: &SurrealDbClient,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db_client
            .query("SELECT * FROM type::table($table) WHERE document_id = $document_id")
            .bind(("table", Self::table_name()))
            .bind(("document_id", document_id.to_string()))
            .await?;
        let chunks: Vec<Self> = response.take(0)?;
        Ok(chunks)
    }
}
