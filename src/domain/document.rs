use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_text, Validate, ValidationError};
use super::SpaceId;

pub type DocumentId = Uuid;

/// A space-level document whose file body lives in the blob store under `file_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub space_id: SpaceId,
    pub title: String,
    pub description: Option<String>,
    pub file_key: Option<String>,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(space_id: SpaceId, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            title: title.into(),
            description: None,
            file_key: None,
            mime_type: None,
            created_at: Utc::now(),
        }
    }

    /// Blob key for the document's file; one file per document.
    pub fn blob_key(&self) -> String {
        format!("documents/{}/{}", self.space_id, self.id)
    }
}

impl Validate for Document {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 100)
    }
}
