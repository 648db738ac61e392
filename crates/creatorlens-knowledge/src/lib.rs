//! CreatorLens Knowledge — batched LLM generation of creator understanding.
//!
//! The pipeline runs four stages over a creator's content library:
//! per-video summaries, topic clusters, a creator profile, and a style
//! analysis. Each stage's output is persisted as a versioned knowledge
//! artifact and progress is reported as a stream of events.

pub mod events;
pub mod pipeline;
pub mod prompts;

pub use events::{ProgressEvent, Stage};
pub use pipeline::KnowledgePipeline;
