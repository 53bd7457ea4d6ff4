use rusqlite::Row;

use crate::core::entry::{Granularity, StoredEntry};
use crate::core::passage::Passage;
use crate::core::types::{BookId, EntryId, SourceId};

use super::store::{CommentaryStore, StoreError};

const CANDIDATE_SQL: &str = "
SELECT e.id, e.source_id, e.commentator_key, e.work_title, e.book_id,
       e.chapter_start, e.verse_start, e.chapter_end, e.verse_end,
       e.granularity, e.passage_label, e.excerpt, e.sort_chapter, e.sort_verse,
       s.source_url, s.local_raw_path
FROM entries e
JOIN sources s ON s.id = e.source_id
WHERE e.book_id = ?1 AND e.chapter_start <= ?2 AND e.chapter_end >= ?3
ORDER BY e.id";

/// Finds stored entries that might discuss a query passage
pub struct CandidateFinder<'a> {
    store: &'a CommentaryStore,
}

impl<'a> CandidateFinder<'a> {
    pub fn new(store: &'a CommentaryStore) -> Self {
        Self { store }
    }

    /// Entries of the same book whose chapter span intersects the query's.
    /// Verse-level overlap is left to scoring.
    ///
    /// # Errors
    ///
    /// Returns a SQLite error if the query fails.
    pub fn find_candidates(&self, query: &Passage) -> Result<Vec<StoredEntry>, StoreError> {
        let mut stmt = self.store.connection().prepare_cached(CANDIDATE_SQL)?;
        let rows = stmt.query_map(
            rusqlite::params![query.book_id().0, query.chapter_end(), query.chapter_start()],
            row_to_entry,
        )?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<StoredEntry> {
    let granularity: String = row.get(9)?;
    Ok(StoredEntry {
        id: EntryId(row.get(0)?),
        source_id: SourceId(row.get(1)?),
        commentator_key: row.get(2)?,
        work_title: row.get(3)?,
        book_id: BookId(row.get(4)?),
        chapter_start: row.get(5)?,
        verse_start: row.get(6)?,
        chapter_end: row.get(7)?,
        verse_end: row.get(8)?,
        granularity: Granularity::parse(&granularity),
        passage_label: row.get(10)?,
        excerpt: row.get(11)?,
        sort_chapter: row.get(12)?,
        sort_verse: row.get(13)?,
        source_url: row.get(14)?,
        local_raw_path: row.get(15)?,
    })
}
