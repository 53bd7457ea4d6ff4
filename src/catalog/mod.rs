//! Commentary index storage.
//!
//! The index is a single SQLite file holding the book canon, registered
//! commentary sources, passage-keyed excerpt entries, a per-commentator
//! coverage projection and a small key/value build manifest.
//!
//! - [`store`]: the [`store::CommentaryStore`] and its transactional writes
//! - [`index`]: chapter-level candidate lookup for queries
//! - [`builder`]: the indexing driver that turns a source manifest into entries
//! - [`schema`]: table layout and version constants
//!
//! ## Example
//!
//! ```rust
//! use bible_commentary::catalog::store::CommentaryStore;
//! use bible_commentary::core::entry::{NewEntry, NewSource};
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
//!
//! let passage = parse("Romans 8:28", true).unwrap();
//! let entry = NewEntry::from_passage("henry", "Commentary on the Whole Bible", &passage, "All things...");
//! store.replace_entries_for_source(source, &[entry]).unwrap();
//! assert_eq!(store.entry_count().unwrap(), 1);
//! ```

pub mod builder;
pub mod index;
pub mod schema;
pub mod store;
