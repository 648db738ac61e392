//! CreatorLens Vector — embedding backends and the per-creator JSON vector store.

pub mod document;
pub mod embedder;
pub mod store;
pub mod types;

pub use document::build_document_text;
pub use embedder::{EmbeddingBackend, NoopEmbedder, OpenAiEmbedder};
pub use store::{DocumentedItem, VectorStore};
pub use types::{EntryMetadata, SearchHit, VectorEntry};
