//! # bible-commentary
//!
//! A library for indexing public-domain Bible commentary by the passage it
//! discusses, and retrieving the most relevant excerpts for a reference.
//!
//! Commentaries are long works whose structure only loosely follows the text:
//! one paragraph treats a single verse, the next a whole chapter, another
//! a range crossing chapter boundaries. `bible-commentary` parses those
//! references into canonical passages, stores every excerpt in a local SQLite
//! index keyed by book and chapter span, and ranks candidates for a query by
//! how precisely they cover it.
//!
//! ## Features
//!
//! - **Reference parsing**: `Rom. 8:28-30`, `1 Cor 13`, `Romans 8:38-9:5`, `Psalm 23`
//! - **Reference scanning**: finds every `C:V` reference embedded in prose
//! - **Transactional indexing**: each source is replaced all-or-nothing
//! - **Ranked retrieval**: verse-level excerpts outrank chapter overviews,
//!   preferred commentators break ties, duplicates are collapsed
//!
//! ## Example
//!
//! ```rust
//! use bible_commentary::{CommentaryStore, CommentatorPriority, NewEntry, NewSource, SearchEngine};
//! use bible_commentary::parsing::reference::parse;
//!
//! let mut store = CommentaryStore::open_in_memory().unwrap();
//! store.init_schema().unwrap();
//!
//! let source = store
//!     .upsert_source(&NewSource {
//!         commentator_key: "henry".into(),
//!         work_title: "Commentary on the Whole Bible".into(),
//!         source_url: "https://example.com/henry".into(),
//!         local_raw_path: "henry/romans.txt".into(),
//!         parser_name: "refscan".into(),
//!         parser_version: "0.1".into(),
//!         content_hash: None,
//!     })
//!     .unwrap();
//! let verse = parse("Romans 8:28", true).unwrap();
//! let chapter = parse("Romans 8", true).unwrap();
//! store
//!     .replace_entries_for_source(
//!         source,
//!         &[
//!             NewEntry::from_passage("henry", "Commentary", &chapter, "An overview of the chapter."),
//!             NewEntry::from_passage("henry", "Commentary", &verse, "All things work together."),
//!         ],
//!     )
//!     .unwrap();
//!
//! let engine = SearchEngine::new(&store);
//! let query = parse("Rom 8:28", false).unwrap();
//! let results = engine
//!     .search_passage(&query, &CommentatorPriority::from_order(["henry"]), 5)
//!     .unwrap();
//! assert_eq!(results[0].coverage_label, "Romans 8:28");
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Books, passages and commentary entries
//! - [`parsing`]: Reference parser, scanner and source-format readers
//! - [`catalog`]: SQLite store, candidate lookup and the indexing driver
//! - [`matching`]: Scoring and the search engine
//! - [`config`]: Runtime settings
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::builder::{IndexBuilder, SourceManifest};
pub use catalog::store::{CommentaryStore, StoreError};
pub use core::book::BookRegistry;
pub use core::entry::{Granularity, NewEntry, NewSource, StoredEntry};
pub use core::passage::Passage;
pub use core::types::*;
pub use matching::engine::{CommentatorPriority, ScoredExcerpt, SearchEngine};
pub use parsing::reference::{parse, ReferenceError};
pub use parsing::scan::scan;
