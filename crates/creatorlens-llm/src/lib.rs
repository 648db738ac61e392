//! CreatorLens LLM — chat-completion providers, streaming and blocking.

pub mod config;
pub mod model;
pub mod providers;
pub mod types;

pub use config::{LlmConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL};
pub use model::{ChatModel, ProviderChatModel};
pub use providers::{complete, stream_llm, BoxedStream};
pub use types::{ChatTurn, LlmConfigResponse, LlmConfigUpdate, LlmProvider, StreamChunk};
