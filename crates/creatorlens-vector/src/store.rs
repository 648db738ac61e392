//! JSON-file-backed vector store with one collection per creator.
//!
//! Each creator's embeddings live in `creator_{id}.json` under the store
//! directory. Search is exhaustive cosine similarity, which is plenty for
//! per-creator collections of a few thousand items.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use creatorlens_core::{Error, Result};
use creatorlens_store::ContentItem;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedder::EmbeddingBackend;
use crate::types::{EntryMetadata, SearchHit, VectorEntry};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    items: Vec<VectorEntry>,
}

/// A content item paired with its embedding document and platform label.
pub struct DocumentedItem {
    pub item: ContentItem,
    pub document: String,
    pub platform_label: String,
}

/// Per-creator vector store.
pub struct VectorStore {
    dir: PathBuf,
    embedder: Arc<dyn EmbeddingBackend>,
    // One async lock per creator serializes load-merge-save cycles.
    locks: parking_lot::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorStore {
    pub fn new(dir: impl AsRef<Path>, embedder: Arc<dyn EmbeddingBackend>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self {
            dir,
            embedder,
            locks: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    pub fn embedder_available(&self) -> bool {
        self.embedder.is_available()
    }

    fn collection_path(&self, creator_id: i64) -> PathBuf {
        self.dir.join(format!("creator_{}.json", creator_id))
    }

    fn creator_lock(&self, creator_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(creator_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn load_collection(&self, creator_id: i64) -> Result<Collection> {
        let path = self.collection_path(creator_id);
        if !path.exists() {
            return Ok(Collection::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| Error::Storage(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| Error::Storage(e.to_string()))
    }

    fn save_collection(&self, creator_id: i64, collection: &Collection) -> Result<()> {
        let path = self.collection_path(creator_id);
        let raw =
            serde_json::to_string(collection).map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::write(&path, raw).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Embed content items into the creator's collection. Items already
    /// present (by id) or flagged embedded are skipped. Returns the ids of
    /// items actually added.
    pub async fn embed_content_items(
        &self,
        creator_id: i64,
        items: &[DocumentedItem],
    ) -> Result<Vec<i64>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<&DocumentedItem> = items
            .iter()
            .filter(|d| !d.item.is_embedded && !d.document.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Embed before taking the collection lock so slow API calls don't
        // serialize unrelated creators' merges.
        let docs: Vec<String> = candidates.iter().map(|d| d.document.clone()).collect();
        let embeddings = self.embedder.embed(&docs).await?;

        let lock = self.creator_lock(creator_id);
        let _guard = lock.lock().await;

        let mut collection = self.load_collection(creator_id)?;
        let existing: HashSet<String> = collection.items.iter().map(|e| e.id.clone()).collect();

        let mut added = Vec::new();
        for (documented, embedding) in candidates.iter().zip(embeddings) {
            let item = &documented.item;
            let entry_id = VectorEntry::entry_id(item.id);
            if existing.contains(&entry_id) {
                continue;
            }
            collection.items.push(VectorEntry {
                id: entry_id,
                document: documented.document.clone(),
                metadata: EntryMetadata {
                    content_id: item.id,
                    platform: documented.platform_label.clone(),
                    platform_id: item.platform_id,
                    external_id: item.external_id.clone(),
                    likes: item.likes,
                    views: item.views,
                    comments: item.comments,
                    duration: item.duration,
                    timestamp: item
                        .timestamp
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                },
                embedding,
            });
            added.push(item.id);
        }

        if !added.is_empty() {
            self.save_collection(creator_id, &collection)?;
            info!("Embedded {} items for creator {}", added.len(), creator_id);
        }
        Ok(added)
    }

    /// Semantic search across a creator's collection. Results come back
    /// closest first; an empty or missing collection yields no hits.
    pub async fn search(
        &self,
        creator_id: i64,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<SearchHit>> {
        let collection = self.load_collection(creator_id)?;
        if collection.items.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(std::slice::from_ref(&query.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("Empty embedding response".to_string()))?;

        let mut scored: Vec<(f32, &VectorEntry)> = collection
            .items
            .iter()
            .map(|entry| (cosine_similarity(&query_embedding, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(n_results)
            .map(|(sim, entry)| SearchHit {
                id: entry.id.clone(),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
                distance: 1.0 - sim,
            })
            .collect())
    }

    /// Remove a creator's collection file entirely.
    pub fn delete_collection(&self, creator_id: i64) -> Result<()> {
        let path = self.collection_path(creator_id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| Error::Storage(e.to_string()))?;
        }
        self.locks.lock().remove(&creator_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::NoopEmbedder;
    use tempfile::TempDir;

    fn test_item(id: i64, caption: &str) -> DocumentedItem {
        DocumentedItem {
            item: ContentItem {
                id,
                platform_id: 1,
                external_id: format!("ext{}", id),
                url: None,
                title: None,
                caption: Some(caption.to_string()),
                transcript: None,
                transcript_source: None,
                timestamp: None,
                likes: 0,
                comments: 0,
                views: 0,
                duration: 0.0,
                is_embedded: false,
                summary: None,
            },
            document: caption.to_string(),
            platform_label: "youtube:test".to_string(),
        }
    }

    fn test_store() -> (VectorStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::new(dir.path(), Arc::new(NoopEmbedder::new(32))).unwrap();
        (store, dir)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_embed_and_search() {
        let (store, _dir) = test_store();
        let items = vec![
            test_item(1, "cooking pasta at home"),
            test_item(2, "travel vlog from japan"),
        ];
        let added = store.embed_content_items(7, &items).await.unwrap();
        assert_eq!(added, vec![1, 2]);

        let hits = store.search(7, "cooking pasta at home", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "content_1");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_re_embed_is_idempotent() {
        let (store, _dir) = test_store();
        let items = vec![test_item(1, "some caption")];
        store.embed_content_items(3, &items).await.unwrap();
        let added = store.embed_content_items(3, &items).await.unwrap();
        assert!(added.is_empty());

        let hits = store.search(3, "some caption", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_search_missing_collection() {
        let (store, _dir) = test_store();
        let hits = store.search(99, "anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let (store, _dir) = test_store();
        store
            .embed_content_items(4, &[test_item(1, "text")])
            .await
            .unwrap();
        store.delete_collection(4).unwrap();
        let hits = store.search(4, "text", 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
