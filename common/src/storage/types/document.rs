use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(Document, "document", {
    name: String,
    section_count: usize
});

impl Document {
    /// The node id is the caller-supplied document id, so re-ingestion
    /// addresses the same record.
    pub fn new(document_id: String, name: String, section_count: usize) -> Self {
        let now = Utc::now();
        Self {
            id: document_id,
            created_at: now,
            updated_at: now,
            name,
            section_count,
        }
    }

    /// Replace any previous node for this document id.
    pub async fn replace(self, db_client: &SurrealDbClient) -> Result<(), AppError> {
        db_client.delete_item::<Self>(&self.id).await?;
        db_client.store_item(self).await?;
        Ok(())
    }
}
