//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all CreatorLens data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Relational database directory (`data/db/`).
    pub db: PathBuf,
    /// Per-creator vector collections (`data/vectors/`).
    pub vectors: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            vectors: root.join("vectors"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.vectors)?;
        Ok(())
    }
}

/// Character budgets and batch tunables.
///
/// All retrieval and prompt-assembly cost bounds live here so a single
/// config value, not a scattered literal, controls each cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Max characters of a question used for keyword/semantic queries.
    pub max_keyword_extract_chars: usize,
    /// Max distinct keywords kept for scoring.
    pub max_keywords: usize,
    /// Max characters of the current user turn sent to the model.
    pub max_user_msg_chars: usize,
    /// Per-history-turn truncation cap.
    pub max_history_turn_chars: usize,
    /// Number of past turns loaded for model context.
    pub chat_history_limit: usize,
    /// Hard cap on assembled transcript context.
    pub max_context_chars: usize,
    /// Hard cap on the content catalog.
    pub max_catalog_chars: usize,
    /// Final backstop cap on the whole system prompt.
    pub max_system_prompt_chars: usize,
    /// Per-item transcript cap inside retrieved context.
    pub max_transcript_per_item: usize,
    /// Items per LLM summarization batch.
    pub summary_batch_size: usize,
    /// Seconds to sleep between summarization batches.
    pub rate_limit_delay_secs: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_keyword_extract_chars: 500,
            max_keywords: 15,
            max_user_msg_chars: 12_000,
            max_history_turn_chars: 3_000,
            chat_history_limit: 10,
            max_context_chars: 60_000,
            max_catalog_chars: 40_000,
            max_system_prompt_chars: 120_000,
            max_transcript_per_item: 8_000,
            summary_batch_size: 10,
            rate_limit_delay_secs: 1.0,
        }
    }
}

/// Top-level CreatorLens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorLensConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Character budgets and batch tunables.
    pub limits: Limits,
}

impl CreatorLensConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            limits: Limits::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.db.is_dir());
        assert!(paths.vectors.is_dir());
    }

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_context_chars, 60_000);
        assert_eq!(limits.max_catalog_chars, 40_000);
        assert_eq!(limits.max_system_prompt_chars, 120_000);
        assert_eq!(limits.summary_batch_size, 10);
    }
}
