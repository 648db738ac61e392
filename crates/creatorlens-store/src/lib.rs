//! CreatorLens relational store.
//!
//! SQLite persistence for creators, platforms, scraped content items, chat
//! sessions/messages, versioned knowledge artifacts, and scrape jobs.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
