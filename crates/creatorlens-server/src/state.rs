//! Shared application state.

use std::collections::HashSet;
use std::sync::Arc;

use creatorlens_chat::ChatEngine;
use creatorlens_core::{ContentSource, CreatorLensConfig};
use creatorlens_llm::{ChatModel, LlmConfig, ProviderChatModel};
use creatorlens_store::SqliteStore;
use creatorlens_vector::VectorStore;
use parking_lot::{Mutex, RwLock};

use crate::progress::ProgressRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CreatorLensConfig,
    pub store: Arc<SqliteStore>,
    pub vectors: Arc<VectorStore>,
    pub engine: ChatEngine,
    pub llm_config: RwLock<LlmConfig>,
    /// Live progress streams for running knowledge generations, keyed
    /// by creator id.
    pub progress: ProgressRegistry,
    /// Live progress streams for running scrape jobs, keyed by job id.
    pub scrape_progress: ProgressRegistry,
    /// Registered scrapers, one per platform kind.
    pub sources: Vec<Arc<dyn ContentSource>>,
    // Creators with a knowledge generation currently running.
    generating: Mutex<HashSet<i64>>,
    // Creators with a scrape currently running.
    scraping: Mutex<HashSet<i64>>,
}

impl AppState {
    pub fn new(
        config: CreatorLensConfig,
        store: Arc<SqliteStore>,
        vectors: Arc<VectorStore>,
        sources: Vec<Arc<dyn ContentSource>>,
    ) -> Self {
        let llm_config = LlmConfig::load(&config.data_paths.llm_config_file);
        let engine = ChatEngine::new(
            Arc::clone(&store),
            Arc::clone(&vectors),
            config.limits.clone(),
        );

        Self {
            config,
            store,
            vectors,
            engine,
            llm_config: RwLock::new(llm_config),
            progress: ProgressRegistry::new(),
            scrape_progress: ProgressRegistry::new(),
            sources,
            generating: Mutex::new(HashSet::new()),
            scraping: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve the configured provider into a usable chat model.
    pub fn chat_model(&self) -> Option<Arc<dyn ChatModel>> {
        let (provider, model, api_key) = self.llm_config.read().resolve_provider()?;
        Some(Arc::new(ProviderChatModel::new(provider, model, api_key)))
    }

    /// Claim the generation slot for a creator. Returns false when a run
    /// is already in flight.
    pub fn begin_generation(&self, creator_id: i64) -> bool {
        self.generating.lock().insert(creator_id)
    }

    pub fn end_generation(&self, creator_id: i64) {
        self.generating.lock().remove(&creator_id);
    }

    /// Claim the scrape slot for a creator. Returns false when a scrape
    /// is already in flight.
    pub fn begin_scrape(&self, creator_id: i64) -> bool {
        self.scraping.lock().insert(creator_id)
    }

    pub fn end_scrape(&self, creator_id: i64) {
        self.scraping.lock().remove(&creator_id);
    }
}
