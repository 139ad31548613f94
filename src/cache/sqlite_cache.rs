use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{MemoWeaveError, Result};
use crate::note::Note;

const CACHE_DB: &str = "cache.db";

/// SQLite cache for full-text search and query acceleration
pub struct SqliteCache {
    conn: Connection,
    #[allow(dead_code)]
    path: PathBuf,
}

impl SqliteCache {
    /// Open or create the cache database
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CACHE_DB);
        let conn = Connection::open(&path)?;

        let cache = Self { conn, path };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        // Metadata table for version tracking
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        // Notes table
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT,
                tags TEXT,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                color TEXT,
                due_date TEXT,
                plan_id TEXT,
                pinned INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                trashed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // FTS5 virtual table for full-text search on notes
        self.conn.execute(
            "CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
                id,
                title,
                content,
                tags,
                content='notes',
                content_rowid='rowid'
            )",
            [],
        )?;

        // Triggers to keep FTS in sync with the notes table
        self.conn.execute_batch(
            "
            CREATE TRIGGER IF NOT EXISTS notes_ai AFTER INSERT ON notes BEGIN
                INSERT INTO notes_fts(rowid, id, title, content, tags)
                VALUES (new.rowid, new.id, new.title, new.content, new.tags);
            END;

            CREATE TRIGGER IF NOT EXISTS notes_ad AFTER DELETE ON notes BEGIN
                INSERT INTO notes_fts(notes_fts, rowid, id, title, content, tags)
                VALUES ('delete', old.rowid, old.id, old.title, old.content, old.tags);
            END;

            CREATE TRIGGER IF NOT EXISTS notes_au AFTER UPDATE ON notes BEGIN
                INSERT INTO notes_fts(notes_fts, rowid, id, title, content, tags)
                VALUES ('delete', old.rowid, old.id, old.title, old.content, old.tags);
                INSERT INTO notes_fts(rowid, id, title, content, tags)
                VALUES (new.rowid, new.id, new.title, new.content, new.tags);
            END;
            ",
        )?;

        // Indexes for common filters
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_status ON notes(status)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_plan ON notes(plan_id)",
            [],
        )?;

        Ok(())
    }

    /// Get the stored document version hash
    pub fn get_store_version(&self) -> Result<Option<String>> {
        let result: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'store_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Set the stored document version hash
    pub fn set_store_version(&self, version: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('store_version', ?1)",
            [version],
        )?;
        Ok(())
    }

    /// Index a note in the cache
    pub fn index_note(&self, note: &Note) -> Result<()> {
        let tags_str = note.tags.join(", ");

        self.conn.execute(
            "INSERT OR REPLACE INTO notes
             (id, title, content, tags, status, priority, color, due_date, plan_id,
              pinned, archived, trashed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                tags_str,
                note.status.to_string(),
                note.priority.to_string(),
                note.color,
                note.due_date.map(|d| d.to_string()),
                note.plan_id.map(|p| p.to_string()),
                note.pinned,
                note.archived,
                note.trashed,
                note.created_at.to_rfc3339(),
                note.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Remove a note from the cache
    pub fn remove_note(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Clear all cached data (for full rebuild)
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM notes", [])?;
        self.conn.execute("DELETE FROM meta", [])?;
        Ok(())
    }

    /// Number of indexed notes
    pub fn note_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Full-text search for notes. Trashed notes are excluded.
    pub fn search_notes(&self, query: &str) -> Result<Vec<NoteSearchResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.title, n.status, n.priority,
                    highlight(notes_fts, 1, '<mark>', '</mark>') as title_highlight,
                    snippet(notes_fts, 2, '<mark>', '</mark>', '...', 32) as content_snippet
             FROM notes_fts f
             JOIN notes n ON n.id = f.id
             WHERE notes_fts MATCH ?1 AND n.trashed = 0
             ORDER BY rank
             LIMIT 50",
        )?;

        let results = stmt
            .query_map([query], |row| {
                Ok(NoteSearchResult {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    status: row.get(2)?,
                    priority: row.get(3)?,
                    title_highlight: row.get(4)?,
                    content_snippet: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Sync the cache with the note store
    /// Returns true if a full reindex was performed
    pub fn sync_from_store(&self, notes: &[Note], store_version: &str) -> Result<bool> {
        let stored_version = self.get_store_version()?;

        // If versions match, cache is up to date
        if stored_version.as_deref() == Some(store_version) {
            return Ok(false);
        }

        // For now, do a full reindex
        // TODO: Implement incremental sync by tracking per-note versions
        self.clear()?;

        for note in notes {
            self.index_note(note)?;
        }

        self.set_store_version(store_version)?;

        Ok(true)
    }
}

/// Search result from full-text search
#[derive(Debug, Clone)]
pub struct NoteSearchResult {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub title_highlight: Option<String>,
    pub content_snippet: Option<String>,
}

// Implement From for rusqlite::Error
impl From<rusqlite::Error> for MemoWeaveError {
    fn from(e: rusqlite::Error) -> Self {
        MemoWeaveError::Storage(format!("SQLite error: {}", e))
    }
}
