//! The `ChatModel` seam used by the knowledge pipeline and chat engine.

use async_trait::async_trait;
use creatorlens_core::Result;
use reqwest::Client;

use crate::providers::{complete, stream_llm, BoxedStream};
use crate::types::{ChatTurn, LlmProvider};

/// A chat completion backend. Implemented by `ProviderChatModel` in
/// production and by in-memory fakes in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a full completion and return the response text.
    async fn complete(&self, messages: Vec<ChatTurn>, max_tokens: usize) -> Result<String>;

    /// Stream a completion as token chunks.
    fn stream(&self, messages: Vec<ChatTurn>, max_tokens: usize) -> BoxedStream;

    /// Human-readable "provider/model" label for logging and responses.
    fn label(&self) -> String;
}

/// A resolved provider binding: provider + model + key.
pub struct ProviderChatModel {
    client: Client,
    provider: LlmProvider,
    model: String,
    api_key: String,
    temperature: f64,
}

impl ProviderChatModel {
    pub fn new(provider: LlmProvider, model: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            provider,
            model,
            api_key,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for ProviderChatModel {
    async fn complete(&self, messages: Vec<ChatTurn>, max_tokens: usize) -> Result<String> {
        complete(
            &self.client,
            self.provider,
            messages,
            &self.model,
            &self.api_key,
            self.temperature,
            max_tokens,
        )
        .await
    }

    fn stream(&self, messages: Vec<ChatTurn>, max_tokens: usize) -> BoxedStream {
        stream_llm(
            &self.client,
            self.provider,
            messages,
            &self.model,
            &self.api_key,
            self.temperature,
            max_tokens,
        )
    }

    fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}
