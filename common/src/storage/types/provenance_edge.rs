use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document_chunk::deserialize_flexible_id;
use crate::{error::AppError, storage::db::SurrealDbClient};

/// `document -HAS_SECTION-> section` edge, ordered by the section's position
/// in the extracted list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HasSectionEdge {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(rename = "in", deserialize_with = "deserialize_flexible_id")]
    pub in_: String,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub out: String,
    pub document_id: String,
    pub order: usize,
}

impl HasSectionEdge {
    pub fn new(document_id: String, section_node_id: String, order: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            in_: document_id.clone(),
            out: section_node_id,
            document_id,
            order,
        }
    }

    pub async fn store(&self, db_client: &SurrealDbClient) -> Result<(), AppError> {
        let query = format!(
            r#"RELATE document:`{}`->has_section:`{}`->section:`{}`
            SET
                document_id = '{}',
                `order` = {}"#,
            self.in_, self.id, self.out, self.document_id, self.order
        );

        db_client.query(query).await?;

        Ok(())
    }

    pub async fn delete_by_document_id(
        document_id: &str,
        db_client: &SurrealDbClient,
    ) -> Result<(), AppError> {
        db_client
            .query("DELETE has_section WHERE document_id = $document_id")
            .bind(("document_id", document_id.to_string()))
            .await?;

        Ok(())
    }
}

/// `section -CONTAINS_CHUNK-> chunk_ref` edge. A chunk spanning N sections
/// carries N of these, one from each contributing section node.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContainsChunkEdge {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    #[serde(rename = "in", deserialize_with = "deserialize_flexible_id")]
    pub in_: String,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub out: String,
    pub document_id: String,
}

impl ContainsChunkEdge {
    pub fn new(document_id: String, section_node_id: String, chunk_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            in_: section_node_id,
            out: chunk_id,
            document_id,
        }
    }

    pub async fn store(&self, db_client: &SurrealDbClient) -> Result<(), AppError> {
        let query = format!(
            r#"RELATE section:`{}`->contains_chunk:`{}`->chunk_ref:`{}`
            SET
                document_id = '{}'"#,
            self.in_, self.id, self.out, self.document_id
        );

        db_client.query(query).await?;

        Ok(())
    }

    pub async fn delete_by_document_id(
        document_id: &str,
        db_client: &SurrealDbClient,
    ) -> Result<(), AppError> {
        db_client
            .query("DELETE contains_chunk WHERE document_id = $document_id")
            .bind(("document_id", document_id.to_string()))
            .await?;

        Ok(())
    }

    pub async fn count_for_document(
        document_id: &str,
        db_client: &SurrealDbClient,
    ) -> Result<usize, AppError> {
        let mut response = db_client
            .query("SELECT * FROM contains_chunk WHERE document_id = $document_id")
            .bind(("document_id", document_id.to_string()))
            .await?;
        let edges: Vec<Self> = response.take(0)?;
        Ok(edges.len())
    }
}
