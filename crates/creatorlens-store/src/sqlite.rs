//! SQLite-backed store with creator/content/chat/knowledge operations.

use std::path::{Path, PathBuf};

use creatorlens_core::{Error, NewContentItem, PlatformKind, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::types::*;

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite store behind a single connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the store. `db_dir` is the directory; the file will
    /// be `db_dir/creatorlens.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("creatorlens.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let creators = store.list_creators()?.len();
        info!(
            "SqliteStore initialized: {} creators, path={}",
            creators,
            store.db_path.display()
        );

        Ok(store)
    }

    // ---------------------------------------------------------------
    // Creators
    // ---------------------------------------------------------------

    pub fn create_creator(&self, name: &str) -> Result<Creator> {
        let now = now_millis();
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached("INSERT INTO creators (name, created_at) VALUES (?1, ?2)")
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![name, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Creator {
            id,
            name: name.to_string(),
            summary: None,
            summary_generated_at: None,
            created_at: now,
        })
    }

    pub fn get_creator(&self, id: i64) -> Result<Option<Creator>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM creators WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_creator(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn list_creators(&self) -> Result<Vec<Creator>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM creators ORDER BY created_at DESC")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_creator(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Delete a creator; platforms, content, sessions, and knowledge cascade.
    pub fn delete_creator(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM creators WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    pub fn rename_creator(&self, id: i64, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("UPDATE creators SET name = ?1 WHERE id = ?2", params![name, id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Overwrite the creator's fallback summary text.
    pub fn update_creator_summary(&self, id: i64, summary: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE creators SET summary = ?1, summary_generated_at = ?2 WHERE id = ?3",
                params![summary, now_millis(), id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Platforms
    // ---------------------------------------------------------------

    pub fn add_platform(
        &self,
        creator_id: i64,
        kind: PlatformKind,
        handle: &str,
        url: Option<&str>,
    ) -> Result<Platform> {
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO platforms (creator_id, kind, handle, url) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![creator_id, kind.as_str(), handle, url])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Platform {
            id,
            creator_id,
            kind,
            handle: handle.to_string(),
            url: url.map(|u| u.to_string()),
            last_scraped_at: None,
        })
    }

    pub fn get_platform(&self, id: i64) -> Result<Option<Platform>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM platforms WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_platform(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn platforms_for_creator(&self, creator_id: i64) -> Result<Vec<Platform>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM platforms WHERE creator_id = ?1 ORDER BY id")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id], |row| Ok(Self::row_to_platform(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Delete a platform; its content items cascade.
    pub fn delete_platform(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM platforms WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    pub fn mark_platform_scraped(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE platforms SET last_scraped_at = ?1 WHERE id = ?2",
                params![now_millis(), id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Content items
    // ---------------------------------------------------------------

    /// Insert a scraped item. Returns `None` when an item with the same
    /// external id already exists on the platform (idempotent dedup).
    pub fn insert_content_item(
        &self,
        platform_id: i64,
        item: &NewContentItem,
    ) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let result = conn
            .prepare_cached(
                "INSERT INTO content_items \
                 (platform_id, external_id, url, title, caption, transcript, \
                  transcript_source, timestamp, likes, comments, views, duration) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![
                platform_id,
                item.external_id,
                item.url,
                item.title,
                item.caption,
                item.transcript,
                item.transcript_source,
                item.timestamp.map(|t| t.timestamp_millis()),
                item.likes,
                item.comments,
                item.views,
                item.duration,
            ]);

        match result {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.to_string().contains("UNIQUE constraint") => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    pub fn get_content_item(&self, id: i64) -> Result<Option<ContentItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM content_items WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_item(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// All of a creator's items across platforms, newest first. Items with
    /// no timestamp sort last.
    pub fn items_for_creator(&self, creator_id: i64) -> Result<Vec<ContentItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ci.* FROM content_items ci \
                 JOIN platforms p ON ci.platform_id = p.id \
                 WHERE p.creator_id = ?1 \
                 ORDER BY ci.timestamp DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id], |row| Ok(Self::row_to_item(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Paged, sorted view of a creator's items for the listing endpoint,
    /// optionally narrowed to one platform. The sort column and direction
    /// come from closed enums, never raw query text.
    pub fn list_items_for_creator(
        &self,
        creator_id: i64,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>> {
        let filter = if query.platform.is_some() {
            " AND p.kind = ?2"
        } else {
            ""
        };
        let sql = format!(
            "SELECT ci.* FROM content_items ci \
             JOIN platforms p ON ci.platform_id = p.id \
             WHERE p.creator_id = ?1{} \
             ORDER BY ci.{} {} \
             LIMIT {} OFFSET {}",
            filter,
            query.sort.column(),
            query.order.keyword(),
            query.limit,
            query.offset,
        );
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let map = |row: &rusqlite::Row<'_>| Ok(Self::row_to_item(row));
        let rows = match query.platform {
            Some(kind) => stmt.query_map(params![creator_id, kind.as_str()], map),
            None => stmt.query_map(params![creator_id], map),
        }
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn unsummarized_items_for_creator(&self, creator_id: i64) -> Result<Vec<ContentItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ci.* FROM content_items ci \
                 JOIN platforms p ON ci.platform_id = p.id \
                 WHERE p.creator_id = ?1 AND ci.summary IS NULL \
                 ORDER BY ci.timestamp DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id], |row| Ok(Self::row_to_item(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn top_items_by_views(&self, creator_id: i64, limit: usize) -> Result<Vec<ContentItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ci.* FROM content_items ci \
                 JOIN platforms p ON ci.platform_id = p.id \
                 WHERE p.creator_id = ?1 \
                 ORDER BY ci.views DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id, limit as i64], |row| {
                Ok(Self::row_to_item(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Set an item's AI summary. Knowledge-pipeline-only mutation.
    pub fn set_item_summary(&self, id: i64, summary: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE content_items SET summary = ?1 WHERE id = ?2",
                params![summary, id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Flag items as present in the vector store.
    pub fn mark_items_embedded(&self, ids: &[i64]) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("UPDATE content_items SET is_embedded = 1 WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        for id in ids {
            stmt.execute(params![id])
                .map_err(|e| Error::Database(e.to_string()))?;
        }
        Ok(())
    }

    pub fn count_items_for_platform(&self, platform_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM content_items WHERE platform_id = ?1",
            params![platform_id],
            |row| row.get(0),
        )
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn count_summarized_for_creator(&self, creator_id: i64) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM content_items ci \
             JOIN platforms p ON ci.platform_id = p.id \
             WHERE p.creator_id = ?1 AND ci.summary IS NOT NULL",
            params![creator_id],
            |row| row.get(0),
        )
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Aggregate engagement stats across a creator's content.
    pub fn creator_stats(&self, creator_id: i64) -> Result<CreatorStats> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(ci.views), 0), \
                    COALESCE(AVG(ci.views), 0), COALESCE(AVG(ci.likes), 0), \
                    COALESCE(AVG(ci.comments), 0) \
             FROM content_items ci \
             JOIN platforms p ON ci.platform_id = p.id \
             WHERE p.creator_id = ?1",
            params![creator_id],
            |row| {
                Ok(CreatorStats {
                    total_items: row.get(0)?,
                    total_views: row.get(1)?,
                    avg_views: row.get::<_, f64>(2)? as i64,
                    avg_likes: row.get::<_, f64>(3)? as i64,
                    avg_comments: row.get::<_, f64>(4)? as i64,
                })
            },
        )
        .map_err(|e| Error::Database(e.to_string()))
    }

    // ---------------------------------------------------------------
    // Chat sessions + messages
    // ---------------------------------------------------------------

    pub fn create_chat_session(&self, creator_id: i64, title: &str) -> Result<ChatSession> {
        let now = now_millis();
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO chat_sessions (creator_id, title, created_at) VALUES (?1, ?2, ?3)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![creator_id, title, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(ChatSession {
            id,
            creator_id,
            title: title.to_string(),
            created_at: now,
        })
    }

    pub fn get_chat_session(&self, id: i64) -> Result<Option<ChatSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM chat_sessions WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_session(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn sessions_for_creator(&self, creator_id: i64) -> Result<Vec<ChatSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM chat_sessions WHERE creator_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id], |row| Ok(Self::row_to_session(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn set_session_title(&self, id: i64, title: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE chat_sessions SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Messages cascade via the session foreign key.
    pub fn delete_chat_session(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    pub fn add_chat_message(
        &self,
        session_id: i64,
        role: &str,
        content: &str,
    ) -> Result<ChatMessage> {
        let now = now_millis();
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO chat_messages (session_id, role, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![session_id, role, content, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(ChatMessage {
            id,
            session_id,
            role: role.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// All messages in creation order.
    pub fn messages_for_session(&self, session_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![session_id], |row| Ok(Self::row_to_message(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// The most recent `limit` messages, oldest first.
    pub fn recent_history(&self, session_id: i64, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM chat_messages WHERE session_id = ?1 \
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![session_id, limit as i64], |row| {
                Ok(Self::row_to_message(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        let mut messages: Vec<ChatMessage> = rows.filter_map(|r| r.ok()).collect();
        messages.reverse();
        Ok(messages)
    }

    // ---------------------------------------------------------------
    // Knowledge artifacts
    // ---------------------------------------------------------------

    /// Upsert a knowledge artifact: insert at version 1, or overwrite the
    /// content in place and increment the version.
    pub fn upsert_knowledge(
        &self,
        creator_id: i64,
        kind: KnowledgeKind,
        content: &str,
    ) -> Result<CreatorKnowledge> {
        let now = now_millis();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO creator_knowledge (creator_id, kind, content, generated_at, version) \
             VALUES (?1, ?2, ?3, ?4, 1) \
             ON CONFLICT(creator_id, kind) DO UPDATE SET \
                 content = excluded.content, \
                 generated_at = excluded.generated_at, \
                 version = version + 1",
            params![creator_id, kind.as_str(), content, now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare_cached("SELECT * FROM creator_knowledge WHERE creator_id = ?1 AND kind = ?2")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![creator_id, kind.as_str()], |row| {
            Ok(Self::row_to_knowledge(row))
        })
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn get_knowledge(
        &self,
        creator_id: i64,
        kind: KnowledgeKind,
    ) -> Result<Option<CreatorKnowledge>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM creator_knowledge WHERE creator_id = ?1 AND kind = ?2")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![creator_id, kind.as_str()], |row| {
            Ok(Self::row_to_knowledge(row))
        })
        .optional()
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub fn knowledge_for_creator(&self, creator_id: i64) -> Result<Vec<CreatorKnowledge>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM creator_knowledge WHERE creator_id = ?1 ORDER BY kind",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id], |row| Ok(Self::row_to_knowledge(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Scrape jobs
    // ---------------------------------------------------------------

    pub fn create_scrape_job(&self, creator_id: i64) -> Result<ScrapeJob> {
        let now = now_millis();
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO scrape_jobs (creator_id, status, started_at) \
                 VALUES (?1, 'running', ?2)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![creator_id, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(ScrapeJob {
            id,
            creator_id,
            status: "running".to_string(),
            new_items_found: 0,
            error_message: None,
            started_at: Some(now),
            completed_at: None,
        })
    }

    pub fn finish_scrape_job(
        &self,
        id: i64,
        new_items_found: i64,
        error: Option<&str>,
    ) -> Result<bool> {
        let status = if error.is_some() { "failed" } else { "completed" };
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE scrape_jobs SET status = ?1, new_items_found = ?2, \
                 error_message = ?3, completed_at = ?4 WHERE id = ?5",
                params![status, new_items_found, error, now_millis(), id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    pub fn get_scrape_job(&self, id: i64) -> Result<Option<ScrapeJob>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM scrape_jobs WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_scrape_job(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Most recent jobs for a creator, newest first.
    pub fn recent_scrape_jobs(&self, creator_id: i64, limit: usize) -> Result<Vec<ScrapeJob>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM scrape_jobs WHERE creator_id = ?1 \
                 ORDER BY started_at DESC, id DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![creator_id, limit as i64], |row| {
                Ok(Self::row_to_scrape_job(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Row mapping helpers
    // ---------------------------------------------------------------

    fn row_to_creator(row: &rusqlite::Row<'_>) -> Creator {
        Creator {
            id: row.get("id").unwrap_or(0),
            name: row.get("name").unwrap_or_default(),
            summary: row.get("summary").ok().flatten(),
            summary_generated_at: row.get("summary_generated_at").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_platform(row: &rusqlite::Row<'_>) -> Platform {
        let kind: String = row.get("kind").unwrap_or_default();
        Platform {
            id: row.get("id").unwrap_or(0),
            creator_id: row.get("creator_id").unwrap_or(0),
            kind: PlatformKind::parse(&kind).unwrap_or(PlatformKind::Instagram),
            handle: row.get("handle").unwrap_or_default(),
            url: row.get("url").ok().flatten(),
            last_scraped_at: row.get("last_scraped_at").ok().flatten(),
        }
    }

    fn row_to_item(row: &rusqlite::Row<'_>) -> ContentItem {
        ContentItem {
            id: row.get("id").unwrap_or(0),
            platform_id: row.get("platform_id").unwrap_or(0),
            external_id: row.get("external_id").unwrap_or_default(),
            url: row.get("url").ok().flatten(),
            title: row.get("title").ok().flatten(),
            caption: row.get("caption").ok().flatten(),
            transcript: row.get("transcript").ok().flatten(),
            transcript_source: row.get("transcript_source").ok().flatten(),
            timestamp: row.get("timestamp").ok().flatten(),
            likes: row.get("likes").unwrap_or(0),
            comments: row.get("comments").unwrap_or(0),
            views: row.get("views").unwrap_or(0),
            duration: row.get("duration").unwrap_or(0.0),
            is_embedded: row.get::<_, i64>("is_embedded").unwrap_or(0) != 0,
            summary: row.get("summary").ok().flatten(),
        }
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> ChatSession {
        ChatSession {
            id: row.get("id").unwrap_or(0),
            creator_id: row.get("creator_id").unwrap_or(0),
            title: row.get("title").unwrap_or_default(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_message(row: &rusqlite::Row<'_>) -> ChatMessage {
        ChatMessage {
            id: row.get("id").unwrap_or(0),
            session_id: row.get("session_id").unwrap_or(0),
            role: row.get("role").unwrap_or_default(),
            content: row.get("content").unwrap_or_default(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_scrape_job(row: &rusqlite::Row<'_>) -> ScrapeJob {
        ScrapeJob {
            id: row.get("id").unwrap_or(0),
            creator_id: row.get("creator_id").unwrap_or(0),
            status: row.get("status").unwrap_or_default(),
            new_items_found: row.get("new_items_found").unwrap_or(0),
            error_message: row.get("error_message").ok().flatten(),
            started_at: row.get("started_at").ok().flatten(),
            completed_at: row.get("completed_at").ok().flatten(),
        }
    }

    fn row_to_knowledge(row: &rusqlite::Row<'_>) -> CreatorKnowledge {
        let kind: String = row.get("kind").unwrap_or_default();
        CreatorKnowledge {
            id: row.get("id").unwrap_or(0),
            creator_id: row.get("creator_id").unwrap_or(0),
            kind: KnowledgeKind::parse(&kind).unwrap_or(KnowledgeKind::Profile),
            content: row.get("content").unwrap_or_default(),
            generated_at: row.get("generated_at").unwrap_or(0),
            version: row.get("version").unwrap_or(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn new_item(external_id: &str, views: i64) -> NewContentItem {
        NewContentItem {
            external_id: external_id.to_string(),
            url: Some(format!("https://example.com/{}", external_id)),
            title: Some(format!("Video {}", external_id)),
            caption: Some("A caption".to_string()),
            transcript: Some("A transcript about things".to_string()),
            transcript_source: Some("youtube_captions".to_string()),
            timestamp: Some(chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
            likes: 10,
            comments: 2,
            views,
            duration: 61.5,
        }
    }

    #[test]
    fn test_creator_crud() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        assert_eq!(creator.name, "Alex");

        let fetched = store.get_creator(creator.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Alex");
        assert!(fetched.summary.is_none());

        store.update_creator_summary(creator.id, "Makes videos").unwrap();
        let fetched = store.get_creator(creator.id).unwrap().unwrap();
        assert_eq!(fetched.summary.as_deref(), Some("Makes videos"));

        assert!(store.delete_creator(creator.id).unwrap());
        assert!(store.get_creator(creator.id).unwrap().is_none());
    }

    #[test]
    fn test_content_item_dedup() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();

        let first = store.insert_content_item(platform.id, &new_item("v1", 100)).unwrap();
        assert!(first.is_some());

        // Same external id on the same platform is a no-op
        let second = store.insert_content_item(platform.id, &new_item("v1", 100)).unwrap();
        assert!(second.is_none());

        let items = store.items_for_creator(creator.id).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unsummarized_and_summary() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::Instagram, "alex", None)
            .unwrap();
        let id = store
            .insert_content_item(platform.id, &new_item("r1", 50))
            .unwrap()
            .unwrap();

        assert_eq!(store.unsummarized_items_for_creator(creator.id).unwrap().len(), 1);
        store.set_item_summary(id, "Short summary").unwrap();
        assert_eq!(store.unsummarized_items_for_creator(creator.id).unwrap().len(), 0);
        assert_eq!(store.count_summarized_for_creator(creator.id).unwrap(), 1);
    }

    #[test]
    fn test_creator_stats() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();
        store.insert_content_item(platform.id, &new_item("v1", 100)).unwrap();
        store.insert_content_item(platform.id, &new_item("v2", 300)).unwrap();

        let stats = store.creator_stats(creator.id).unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_views, 400);
        assert_eq!(stats.avg_views, 200);
        assert_eq!(stats.avg_likes, 10);
        assert_eq!(stats.avg_comments, 2);
    }

    #[test]
    fn test_rename_creator() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        assert!(store.rename_creator(creator.id, "Alexandra").unwrap());
        let fetched = store.get_creator(creator.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Alexandra");
        assert!(!store.rename_creator(999, "Nobody").unwrap());
    }

    #[test]
    fn test_delete_platform_cascades_items() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::Instagram, "alex", None)
            .unwrap();
        let item_id = store
            .insert_content_item(platform.id, &new_item("t1", 5))
            .unwrap()
            .unwrap();

        assert!(store.delete_platform(platform.id).unwrap());
        assert!(store.get_platform(platform.id).unwrap().is_none());
        assert!(store.get_content_item(item_id).unwrap().is_none());
    }

    #[test]
    fn test_list_items_sorting_and_paging() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let yt = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();
        let ig = store
            .add_platform(creator.id, PlatformKind::Instagram, "alex", None)
            .unwrap();
        store.insert_content_item(yt.id, &new_item("v1", 300)).unwrap();
        store.insert_content_item(yt.id, &new_item("v2", 100)).unwrap();
        store.insert_content_item(ig.id, &new_item("r1", 200)).unwrap();

        let by_views = store
            .list_items_for_creator(
                creator.id,
                &ContentQuery {
                    sort: ContentSort::Views,
                    order: SortOrder::Asc,
                    ..ContentQuery::default()
                },
            )
            .unwrap();
        let views: Vec<i64> = by_views.iter().map(|i| i.views).collect();
        assert_eq!(views, vec![100, 200, 300]);

        let yt_only = store
            .list_items_for_creator(
                creator.id,
                &ContentQuery {
                    platform: Some(PlatformKind::YouTube),
                    ..ContentQuery::default()
                },
            )
            .unwrap();
        assert_eq!(yt_only.len(), 2);
        assert!(yt_only.iter().all(|i| i.platform_id == yt.id));

        let page = store
            .list_items_for_creator(
                creator.id,
                &ContentQuery {
                    sort: ContentSort::Views,
                    order: SortOrder::Desc,
                    limit: 1,
                    offset: 1,
                    ..ContentQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].views, 200);
    }

    #[test]
    fn test_top_items_by_views() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();
        store.insert_content_item(platform.id, &new_item("low", 10)).unwrap();
        store.insert_content_item(platform.id, &new_item("high", 9000)).unwrap();

        let top = store.top_items_by_views(creator.id, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].external_id, "high");
    }

    #[test]
    fn test_chat_history_order() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let session = store.create_chat_session(creator.id, "New Chat").unwrap();

        store.add_chat_message(session.id, "user", "first").unwrap();
        store.add_chat_message(session.id, "assistant", "second").unwrap();
        store.add_chat_message(session.id, "user", "third").unwrap();

        let all = store.messages_for_session(session.id).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "first");

        let recent = store.recent_history(session.id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "third");
    }

    #[test]
    fn test_knowledge_versioning() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();

        let first = store
            .upsert_knowledge(creator.id, KnowledgeKind::Topics, "v1 clusters")
            .unwrap();
        assert_eq!(first.version, 1);

        let second = store
            .upsert_knowledge(creator.id, KnowledgeKind::Topics, "v2 clusters")
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.content, "v2 clusters");

        // Still exactly one row for this (creator, kind)
        let all = store.knowledge_for_creator(creator.id).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_delete_creator_cascades() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();
        store.insert_content_item(platform.id, &new_item("v1", 1)).unwrap();
        let session = store.create_chat_session(creator.id, "Chat").unwrap();
        store.add_chat_message(session.id, "user", "hi").unwrap();
        store.upsert_knowledge(creator.id, KnowledgeKind::Style, "style").unwrap();

        store.delete_creator(creator.id).unwrap();
        assert!(store.get_platform(platform.id).unwrap().is_none());
        assert!(store.get_chat_session(session.id).unwrap().is_none());
        assert!(store.knowledge_for_creator(creator.id).unwrap().is_empty());
    }

    #[test]
    fn test_scrape_job_lifecycle() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let job = store.create_scrape_job(creator.id).unwrap();
        assert_eq!(job.status, "running");
        assert!(store.finish_scrape_job(job.id, 7, None).unwrap());

        let fetched = store.get_scrape_job(job.id).unwrap().unwrap();
        assert_eq!(fetched.status, "completed");
        assert_eq!(fetched.new_items_found, 7);
        assert!(fetched.completed_at.is_some());
    }

    #[test]
    fn test_recent_scrape_jobs_newest_first() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let first = store.create_scrape_job(creator.id).unwrap();
        let second = store.create_scrape_job(creator.id).unwrap();
        store.finish_scrape_job(first.id, 1, None).unwrap();
        store.finish_scrape_job(second.id, 0, Some("network error")).unwrap();

        let jobs = store.recent_scrape_jobs(creator.id, 10).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[0].status, "failed");
        assert_eq!(jobs[0].error_message.as_deref(), Some("network error"));

        let limited = store.recent_scrape_jobs(creator.id, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_delete_chat_session_cascades_messages() {
        let (store, _dir) = test_store();
        let creator = store.create_creator("Alex").unwrap();
        let session = store.create_chat_session(creator.id, "Chat").unwrap();
        store.add_chat_message(session.id, "user", "hi").unwrap();
        store.add_chat_message(session.id, "assistant", "hello").unwrap();

        assert!(store.delete_chat_session(session.id).unwrap());
        assert!(store.get_chat_session(session.id).unwrap().is_none());
        assert!(store.messages_for_session(session.id).unwrap().is_empty());
        assert!(!store.delete_chat_session(session.id).unwrap());
    }
}
