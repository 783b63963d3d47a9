//! Uploaded document models.
//!
//! A document row is created before the bytes exist: the client receives a
//! presigned upload URL, puts the file straight into S3, and the upload
//! notification flips the row from `pending` to `uploaded`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::status::{DocumentStatus, DocumentType},
    shared::{BusinessId, ConsumerId, DocumentId, OwnerId},
};

/// Represents a row of the `documents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
    pub id: DocumentId,
    pub business_id: Option<BusinessId>,
    pub consumer_id: Option<ConsumerId>,

    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,

    pub content_type: String,

    /// Object key in the document bucket: `<owner-id>/<document-id>`
    pub storage_key: String,

    pub size_bytes: Option<i64>,

    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,

    /// API client that registered the document
    pub created_by: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

impl Document {
    pub fn owner(&self) -> Option<OwnerId> {
        OwnerId::from_columns(self.business_id, self.consumer_id)
    }
}

/// Object key for a document.
pub fn storage_key(owner: &OwnerId, id: &DocumentId) -> String {
    format!("{owner}/{id}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub owner_id: OwnerId,
    pub document_type: DocumentType,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: DocumentId,
    pub owner_id: Option<OwnerId>,
    pub document_type: DocumentType,
    pub content_type: String,
    pub size_bytes: Option<i64>,
    pub status: DocumentStatus,
    pub created_by: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    /// Presigned URL; only present on creation (upload) or on the url endpoint (download)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            owner_id: document.owner(),
            document_type: document.document_type,
            content_type: document.content_type,
            size_bytes: document.size_bytes,
            status: document.status,
            created_by: document.created_by,
            created: document.created,
            modified: document.modified,
            url: None,
        }
    }
}

impl DocumentResponse {
    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_nests_document_under_owner() {
        let owner = OwnerId::Business(BusinessId::new());
        let id = DocumentId::new();

        let key = storage_key(&owner, &id);

        assert_eq!(key, format!("{owner}/{id}"));
        assert!(key.starts_with("bus-"));
        assert!(key.contains("/doc-"));
    }
}
