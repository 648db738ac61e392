//! CreatorLens Chat — conversation engine with hybrid retrieval.

pub mod engine;
pub mod prompt;

pub use engine::ChatEngine;
pub use prompt::{build_model_messages, build_system_prompt, FileAttachment, PromptInputs};
