use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

// Thin graph-side stand-in for a chunk. Full text lives only in the vector
// index payload (`document_chunk`).
stored_object!(ChunkRef, "chunk_ref", {
    document_id: String,
    token_count: usize
});

impl ChunkRef {
    pub fn new(chunk_id: String, document_id: String, token_count: usize) -> Self {
        let now = Utc::now();
        Self {
            id: chunk_id,
            created_at: now,
            updated_at: now,
            document_id,
            token_count,
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
}
