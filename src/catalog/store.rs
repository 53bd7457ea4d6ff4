use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::catalog::schema::{MANIFEST_SCHEMA_VERSION, SCHEMA_SQL, SCHEMA_VERSION};
use crate::core::book::BookRegistry;
use crate::core::entry::{Granularity, NewEntry, NewSource};
use crate::core::types::{BookId, SourceId};
use crate::utils::validation::{check_entry_limit, normalize_commentator_key};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Commentary store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Unknown source id: {0}")]
    UnknownSource(SourceId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chapter span a commentator has at least one entry for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageSpan {
    pub commentator_key: String,
    pub book_id: BookId,
    pub chapter_start: u32,
    pub chapter_end: u32,
}

/// Stored state of a source, used to decide whether it must be re-indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceState {
    pub id: SourceId,
    pub parser_version: String,
    pub content_hash: Option<String>,
}

/// SQLite-backed store of sources, passage-keyed entries and build metadata.
///
/// All writes go through short transactions. Readers may share one on-disk
/// index as long as no indexing run is replacing it at the same time.
#[derive(Debug)]
pub struct CommentaryStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl CommentaryStore {
    /// Open (or create) an index file, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the parent directory cannot be created and
    /// `StoreError::Unavailable` if SQLite cannot open the file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::configure(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory store
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!(":memory:: {e}")))?;
        Self::configure(conn, None)
    }

    fn configure(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StoreError::Unavailable(format!("cannot enable foreign keys: {e}")))?;
        Ok(Self { conn, path })
    }

    /// Path of the backing file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create tables and indexes if absent, seed the book registry and record
    /// the schema version. Safe to call on every open.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the schema cannot be created, or a
    /// SQLite error if seeding fails.
    pub fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Unavailable(format!("cannot create schema: {e}")))?;

        let tx = self.conn.transaction()?;
        seed_books(&tx)?;
        set_manifest_value(&tx, MANIFEST_SCHEMA_VERSION, SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert a source or refresh its url/parser/hash/timestamp.
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the statement fails.
    pub fn upsert_source(&self, source: &NewSource) -> Result<SourceId, StoreError> {
        self.conn.execute(
            "INSERT INTO sources(commentator_key, work_title, source_url, local_raw_path,
                                 parser_name, parser_version, content_hash, downloaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(commentator_key, work_title, local_raw_path)
             DO UPDATE SET source_url = excluded.source_url,
                           parser_name = excluded.parser_name,
                           parser_version = excluded.parser_version,
                           content_hash = excluded.content_hash,
                           downloaded_at = excluded.downloaded_at",
            params![
                source.commentator_key,
                source.work_title,
                source.source_url,
                source.local_raw_path,
                source.parser_name,
                source.parser_version,
                source.content_hash,
                utc_now(),
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM sources
             WHERE commentator_key = ?1 AND work_title = ?2 AND local_raw_path = ?3",
            params![source.commentator_key, source.work_title, source.local_raw_path],
            |row| row.get(0),
        )?;
        Ok(SourceId(id))
    }

    /// Look up the stored state of a source by its identifying triple
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn find_source(
        &self,
        commentator_key: &str,
        work_title: &str,
        local_raw_path: &str,
    ) -> Result<Option<SourceState>, StoreError> {
        let state = self
            .conn
            .query_row(
                "SELECT id, parser_version, content_hash FROM sources
                 WHERE commentator_key = ?1 AND work_title = ?2 AND local_raw_path = ?3",
                params![commentator_key, work_title, local_raw_path],
                |row| {
                    Ok(SourceState {
                        id: SourceId(row.get(0)?),
                        parser_version: row.get(1)?,
                        content_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// Content hash recorded for a source, if the source exists and has one
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn source_content_hash(
        &self,
        commentator_key: &str,
        work_title: &str,
        local_raw_path: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .find_source(commentator_key, work_title, local_raw_path)?
            .and_then(|state| state.content_hash))
    }

    /// Replace every entry of a source with `entries`, all-or-nothing.
    ///
    /// Old entries are deleted and the new set inserted inside one
    /// transaction; the coverage projection of every affected commentator is
    /// rebuilt in the same transaction. On any failure nothing changes.
    /// Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSource` if the source does not exist,
    /// `StoreError::InvalidEntry` if an entry does not form a valid passage,
    /// has no storable granularity, or the per-source limit is exceeded, and a
    /// SQLite error for storage failures.
    pub fn replace_entries_for_source(
        &mut self,
        source_id: SourceId,
        entries: &[NewEntry],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sources WHERE id = ?1)",
            [source_id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::UnknownSource(source_id));
        }

        let mut commentators: BTreeSet<String> = BTreeSet::new();
        {
            let mut stmt =
                tx.prepare("SELECT DISTINCT commentator_key FROM entries WHERE source_id = ?1")?;
            let rows = stmt.query_map([source_id.0], |row| row.get::<_, String>(0))?;
            for key in rows {
                commentators.insert(key?);
            }
        }

        let removed = tx.execute("DELETE FROM entries WHERE source_id = ?1", [source_id.0])?;

        let now = utc_now();
        {
            let mut insert = tx.prepare(
                "INSERT INTO entries(source_id, commentator_key, work_title, book_id,
                                     chapter_start, verse_start, chapter_end, verse_end,
                                     granularity, passage_label, excerpt,
                                     sort_chapter, sort_verse, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for (count, entry) in entries.iter().enumerate() {
                if let Some(msg) = check_entry_limit(count) {
                    return Err(StoreError::InvalidEntry(msg));
                }
                entry.passage().map_err(|e| {
                    StoreError::InvalidEntry(format!("{:?}: {e}", entry.passage_label))
                })?;
                if entry.granularity == Granularity::Unknown {
                    return Err(StoreError::InvalidEntry(format!(
                        "{:?}: granularity must be verse, range or chapter",
                        entry.passage_label
                    )));
                }

                insert.execute(params![
                    source_id.0,
                    entry.commentator_key,
                    entry.work_title,
                    entry.book_id.0,
                    entry.chapter_start,
                    entry.verse_start,
                    entry.chapter_end,
                    entry.verse_end,
                    entry.granularity.as_str(),
                    entry.passage_label,
                    entry.excerpt,
                    entry.sort_chapter,
                    entry.sort_verse,
                    now,
                ])?;
                commentators.insert(entry.commentator_key.clone());
            }
        }

        for commentator in &commentators {
            rebuild_coverage(&tx, commentator)?;
        }

        tx.commit()?;
        debug!(
            source_id = source_id.0,
            removed,
            inserted = entries.len(),
            "replaced source entries"
        );
        Ok(entries.len())
    }

    /// Read a build manifest value
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn get_manifest(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM build_manifest WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a build manifest value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the statement fails.
    pub fn set_manifest(&self, key: &str, value: &str) -> Result<(), StoreError> {
        set_manifest_value(&self.conn, key, value)?;
        Ok(())
    }

    /// Total number of stored entries
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn entry_count(&self) -> Result<usize, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM entries")
    }

    /// Total number of registered sources
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn source_count(&self) -> Result<usize, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM sources")
    }

    /// Chapter spans a commentator has entries for, in canonical order.
    /// Long-form keys ("matthew_henry") are normalized first.
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn coverage_for(&self, commentator_key: &str) -> Result<Vec<CoverageSpan>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT commentator_key, book_id, chapter_start, chapter_end FROM coverage
             WHERE commentator_key = ?1
             ORDER BY book_id, chapter_start, chapter_end",
        )?;
        let spans = stmt
            .query_map([normalize_commentator_key(commentator_key)], |row| {
                Ok(CoverageSpan {
                    commentator_key: row.get(0)?,
                    book_id: BookId(row.get(1)?),
                    chapter_start: row.get(2)?,
                    chapter_end: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(spans)
    }

    /// Whether a commentator has any entry touching the given chapter
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn has_coverage(
        &self,
        commentator_key: &str,
        book_id: BookId,
        chapter: u32,
    ) -> Result<bool, StoreError> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM coverage
                           WHERE commentator_key = ?1 AND book_id = ?2
                             AND chapter_start <= ?3 AND chapter_end >= ?3)",
            params![normalize_commentator_key(commentator_key), book_id.0, chapter],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

/// Populate `books` and `book_aliases` from the canon unless already seeded
fn seed_books(conn: &Connection) -> Result<(), StoreError> {
    if count(conn, "SELECT COUNT(*) FROM books")? > 0 {
        return Ok(());
    }

    let mut insert_book =
        conn.prepare("INSERT INTO books(id, canon_order, osis, name) VALUES (?1, ?2, ?3, ?4)")?;
    let mut insert_alias =
        conn.prepare("INSERT OR IGNORE INTO book_aliases(alias, book_id) VALUES (?1, ?2)")?;

    for book in BookRegistry::canon().books() {
        insert_book.execute(params![book.id.0, book.id.0, book.osis, book.name])?;
        for alias in &book.aliases {
            insert_alias.execute(params![alias, book.id.0])?;
        }
    }
    debug!("seeded {} books", BookRegistry::canon().len());
    Ok(())
}

fn set_manifest_value(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO build_manifest(key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Recompute one commentator's coverage rows from their current entries
fn rebuild_coverage(conn: &Connection, commentator_key: &str) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM coverage WHERE commentator_key = ?1",
        [commentator_key],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO coverage(commentator_key, book_id, chapter_start, chapter_end, notes)
         SELECT DISTINCT commentator_key, book_id, chapter_start, chapter_end, NULL
         FROM entries WHERE commentator_key = ?1",
        [commentator_key],
    )?;
    Ok(())
}

fn count(conn: &Connection, sql: &str) -> Result<usize, StoreError> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or_default())
}

fn utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::passage::Passage;

    fn test_store() -> CommentaryStore {
        let mut store = CommentaryStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn henry_source() -> NewSource {
        NewSource {
            commentator_key: "henry".to_string(),
            work_title: "Complete Commentary".to_string(),
            source_url: "https://example.com/henry".to_string(),
            local_raw_path: "/tmp/raw/henry.jsonl".to_string(),
            parser_name: "test".to_string(),
            parser_version: "1".to_string(),
            content_hash: None,
        }
    }

    fn entry(passage: &Passage, text: &str) -> NewEntry {
        NewEntry::from_passage("henry", "Complete Commentary", passage, text)
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let mut store = test_store();
        store.init_schema().unwrap();
        let books = count(store.connection(), "SELECT COUNT(*) FROM books").unwrap();
        assert_eq!(books, 66);
        assert_eq!(
            store.get_manifest(MANIFEST_SCHEMA_VERSION).unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
        let alias: i64 = store
            .connection()
            .query_row("SELECT book_id FROM book_aliases WHERE alias = 'psalm'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(alias, 19);
    }

    #[test]
    fn test_upsert_source_keeps_one_row_per_triple() {
        let store = test_store();
        let first = store.upsert_source(&henry_source()).unwrap();

        let mut updated = henry_source();
        updated.source_url = "https://example.com/henry-v2".to_string();
        updated.content_hash = Some("abc".to_string());
        let second = store.upsert_source(&updated).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.source_count().unwrap(), 1);
        let state = store
            .find_source("henry", "Complete Commentary", "/tmp/raw/henry.jsonl")
            .unwrap()
            .unwrap();
        assert_eq!(state.content_hash.as_deref(), Some("abc"));

        let mut other = henry_source();
        other.local_raw_path = "/tmp/raw/henry-2.jsonl".to_string();
        assert_ne!(store.upsert_source(&other).unwrap(), first);
    }

    #[test]
    fn test_replace_entries_leaves_only_second_set() {
        let mut store = test_store();
        let id = store.upsert_source(&henry_source()).unwrap();
        let romans_8 = Passage::chapter(BookId(45), 8).unwrap();
        let romans_9 = Passage::chapter(BookId(45), 9).unwrap();

        store
            .replace_entries_for_source(id, &[entry(&romans_8, "first"), entry(&romans_8, "again")])
            .unwrap();
        assert_eq!(store.entry_count().unwrap(), 2);

        store.replace_entries_for_source(id, &[entry(&romans_9, "second")]).unwrap();
        assert_eq!(store.entry_count().unwrap(), 1);

        let spans = store.coverage_for("henry").unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].chapter_start, spans[0].chapter_end), (9, 9));
        assert!(store.has_coverage("henry", BookId(45), 9).unwrap());
        assert!(!store.has_coverage("henry", BookId(45), 8).unwrap());

        // Long-form keys find the same coverage
        assert_eq!(store.coverage_for("Matthew_Henry").unwrap(), spans);
        assert!(store.has_coverage("matthew_henry", BookId(45), 9).unwrap());
    }

    #[test]
    fn test_replace_entries_rolls_back_on_invalid_entry() {
        let mut store = test_store();
        let id = store.upsert_source(&henry_source()).unwrap();
        let romans_8 = Passage::chapter(BookId(45), 8).unwrap();
        store.replace_entries_for_source(id, &[entry(&romans_8, "kept")]).unwrap();

        let mut broken = entry(&romans_8, "broken");
        broken.chapter_end = 7;
        let result = store.replace_entries_for_source(
            id,
            &[entry(&Passage::chapter(BookId(45), 9).unwrap(), "new"), broken],
        );
        assert!(matches!(result, Err(StoreError::InvalidEntry(_))));

        assert_eq!(store.entry_count().unwrap(), 1);
        let excerpt: String = store
            .connection()
            .query_row("SELECT excerpt FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(excerpt, "kept");
        assert!(store.has_coverage("henry", BookId(45), 8).unwrap());
    }

    #[test]
    fn test_replace_entries_unknown_source() {
        let mut store = test_store();
        let result = store.replace_entries_for_source(SourceId(42), &[]);
        assert!(matches!(result, Err(StoreError::UnknownSource(SourceId(42)))));
    }

    #[test]
    fn test_replace_does_not_touch_other_sources() {
        let mut store = test_store();
        let a = store.upsert_source(&henry_source()).unwrap();
        let mut other = henry_source();
        other.local_raw_path = "/tmp/raw/henry-nt.jsonl".to_string();
        let b = store.upsert_source(&other).unwrap();

        let romans_8 = Passage::chapter(BookId(45), 8).unwrap();
        let john_3 = Passage::chapter(BookId(43), 3).unwrap();
        store.replace_entries_for_source(a, &[entry(&romans_8, "a")]).unwrap();
        store.replace_entries_for_source(b, &[entry(&john_3, "b")]).unwrap();
        store.replace_entries_for_source(a, &[]).unwrap();

        assert_eq!(store.entry_count().unwrap(), 1);
        // Coverage is a projection across all of the commentator's sources
        assert!(store.has_coverage("henry", BookId(43), 3).unwrap());
        assert!(!store.has_coverage("henry", BookId(45), 8).unwrap());
    }

    #[test]
    fn test_manifest_round_trip() {
        let store = test_store();
        assert_eq!(store.get_manifest("parser_version").unwrap(), None);
        store.set_manifest("parser_version", "0.1").unwrap();
        store.set_manifest("parser_version", "0.2").unwrap();
        assert_eq!(store.get_manifest("parser_version").unwrap().as_deref(), Some("0.2"));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index").join("commentary.sqlite");
        let mut store = CommentaryStore::open(&path).unwrap();
        store.init_schema().unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }
}
