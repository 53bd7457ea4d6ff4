//! Commentary retrieval and ranking.
//!
//! - [`SearchEngine`]: main entry point for finding excerpts on a passage
//! - [`ExcerptScore`]: per-candidate score terms
//!
//! ## Scoring
//!
//! Each candidate sharing a chapter with the query scores the sum of:
//!
//! - **Granularity weight**: verse 1.0, range 0.8, chapter 0.45
//! - **Overlap**: verse-interval overlap for aligned chapters, fixed values
//!   for chapter entries, chapter-only queries and misaligned spans
//! - **Preference bonus**: decays with the commentator's rank
//! - **Length bonus**: favors excerpts of a readable length
//!
//! Results are ordered by score, then by position in the book, and
//! duplicates (same commentator, label and excerpt opening) are collapsed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bible_commentary::catalog::store::CommentaryStore;
//! use bible_commentary::matching::engine::{CommentatorPriority, SearchEngine};
//! use bible_commentary::parsing::reference::parse;
//! use std::path::Path;
//!
//! let store = CommentaryStore::open(Path::new("commentary.sqlite")).unwrap();
//! let engine = SearchEngine::new(&store);
//! let passage = parse("Romans 8:28-9:5", false).unwrap();
//! let priority = CommentatorPriority::from_order(["henry", "calvin"]);
//!
//! for excerpt in engine.search_passage(&passage, &priority, 8).unwrap() {
//!     println!("[{}] {} ({:.3})", excerpt.commentator, excerpt.coverage_label, excerpt.score);
//! }
//! ```

pub mod engine;
pub mod scoring;

pub use engine::{CommentatorPriority, ScoredExcerpt, SearchConfig, SearchEngine};
pub use scoring::ExcerptScore;
