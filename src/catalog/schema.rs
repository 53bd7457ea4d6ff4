/// Version of the table layout below, recorded under [`MANIFEST_SCHEMA_VERSION`]
pub const SCHEMA_VERSION: &str = "1";

/// Version of the entry-derivation logic; a change forces a rebuild
pub const PARSER_VERSION: &str = "0.1";

/// Build manifest keys
pub const MANIFEST_SCHEMA_VERSION: &str = "schema_version";
pub const MANIFEST_PARSER_VERSION: &str = "parser_version";
pub const MANIFEST_SOURCE_MANIFEST_VERSION: &str = "source_manifest_version";

pub(crate) const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS books (
  id INTEGER PRIMARY KEY,
  canon_order INTEGER NOT NULL,
  osis TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS book_aliases (
  alias TEXT PRIMARY KEY,
  book_id INTEGER NOT NULL REFERENCES books(id)
);
CREATE TABLE IF NOT EXISTS sources (
  id INTEGER PRIMARY KEY,
  commentator_key TEXT NOT NULL,
  work_title TEXT NOT NULL,
  source_url TEXT NOT NULL,
  local_raw_path TEXT NOT NULL,
  parser_name TEXT NOT NULL,
  parser_version TEXT NOT NULL,
  content_hash TEXT,
  downloaded_at TEXT NOT NULL,
  UNIQUE(commentator_key, work_title, local_raw_path)
);
CREATE TABLE IF NOT EXISTS entries (
  id INTEGER PRIMARY KEY,
  source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
  commentator_key TEXT NOT NULL,
  work_title TEXT NOT NULL,
  book_id INTEGER NOT NULL REFERENCES books(id),
  chapter_start INTEGER NOT NULL,
  verse_start INTEGER,
  chapter_end INTEGER NOT NULL,
  verse_end INTEGER,
  granularity TEXT NOT NULL CHECK(granularity IN ('verse','range','chapter')),
  passage_label TEXT NOT NULL,
  excerpt TEXT NOT NULL,
  sort_chapter INTEGER NOT NULL,
  sort_verse INTEGER NOT NULL,
  created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS coverage (
  commentator_key TEXT NOT NULL,
  book_id INTEGER NOT NULL REFERENCES books(id),
  chapter_start INTEGER NOT NULL,
  chapter_end INTEGER NOT NULL,
  notes TEXT,
  PRIMARY KEY(commentator_key, book_id, chapter_start, chapter_end)
);
CREATE TABLE IF NOT EXISTS build_manifest (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_passage
  ON entries(book_id, chapter_start, chapter_end, verse_start, verse_end);
CREATE INDEX IF NOT EXISTS idx_entries_commentator
  ON entries(commentator_key, book_id, chapter_start);
CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id);
CREATE INDEX IF NOT EXISTS idx_entries_granularity ON entries(granularity);
CREATE INDEX IF NOT EXISTS idx_sources_commentator ON sources(commentator_key);
";
