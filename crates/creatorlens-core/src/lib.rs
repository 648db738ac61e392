//! CreatorLens Core — error types, configuration, scraper interfaces.

pub mod config;
pub mod error;
pub mod source;
pub mod text;

pub use config::{CreatorLensConfig, DataPaths, Limits};
pub use error::{Error, Result};
pub use source::{ContentSource, NewContentItem, PlatformKind};
pub use text::{format_thousands, truncate_chars, truncate_with_marker};
