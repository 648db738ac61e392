use serde::{Deserialize, Serialize};

/// Metadata carried alongside each embedded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub content_id: i64,
    pub platform: String,
    pub platform_id: i64,
    pub external_id: String,
    pub likes: i64,
    pub views: i64,
    pub comments: i64,
    pub duration: f64,
    #[serde(default)]
    pub timestamp: String,
}

/// One stored document + embedding. Entry ids are `content_{item_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub document: String,
    pub metadata: EntryMetadata,
    pub embedding: Vec<f32>,
}

/// A search result. `distance` is 1 - cosine similarity, so lower is closer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: EntryMetadata,
    pub distance: f32,
}

impl VectorEntry {
    pub fn entry_id(content_id: i64) -> String {
        format!("content_{}", content_id)
    }
}
