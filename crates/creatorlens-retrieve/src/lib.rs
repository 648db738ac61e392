//! CreatorLens Retrieve — keyword search, transcript context, content catalog.

pub mod catalog;
pub mod context;
pub mod keyword;

pub use catalog::build_content_catalog;
pub use context::{build_context, format_item_full};
pub use keyword::{extract_keywords, keyword_search, ScoredItem};
