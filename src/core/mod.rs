//! Core data types for passage-keyed commentary.
//!
//! - [`book::BookRegistry`]: the 66-book canon with chapter counts and aliases
//! - [`passage::Passage`]: a validated scripture reference
//! - [`entry::Granularity`], [`entry::NewEntry`], [`entry::StoredEntry`]: commentary excerpts
//! - [`types`]: id newtypes for books, sources and entries
//!
//! ## Passage shapes
//!
//! | Reference | Shape | Granularity |
//! |-----------|-------|-------------|
//! | Psalm 23 | one chapter | chapter |
//! | Romans 8-9 | chapter range | chapter |
//! | Romans 8:28 | one verse | verse |
//! | Romans 8:28-30 | verse range | range |
//! | Romans 8:38-9:5 | cross-chapter range | range |
//!
//! A passage is either chapter-only or carries both verse bounds; the
//! constructors reject anything else.

pub mod book;
pub mod entry;
pub mod passage;
pub mod types;
