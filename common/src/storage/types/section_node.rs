use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(SectionNode, "section", {
    document_id: String,
    heading: String,
    page_no: u32,
    order: usize
});

impl SectionNode {
    pub fn new(document_id: &str, heading: String, page_no: u32, order: usize) -> Self {
        let now = Utc::now();
        Self {
            // Deterministic per document + position, so re-ingestion rewrites
            // the same node instead of accreting copies.
            id: format!("{document_id}-s{order}"),
            created_at: now,
            updated_at: now,
            document_id: document_id.to_string(),
            heading,
            page_no,
            order,
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
            .query("SELECT * FROM type::table($table) WHERE document_id = $document_id ORDER BY `order`")
            .bind(("table", Self::table_name()))
            .bind(("document_id", document_id.to_string()))
            .await?;
        let sections: Vec<Self> = response.take(0)?;
        Ok(sections)
    }
}
