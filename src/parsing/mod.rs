//! Scripture references and commentary text.
//!
//! - [`reference`]: strict parsing of a single human-written reference
//! - [`scan`]: lenient discovery of references inside running prose
//! - [`segment`]: splitting plain-text commentary into reference-keyed excerpts
//! - [`records`]: structured JSONL excerpt records (optionally gzip-compressed)
//!
//! ## Example
//!
//! ```rust
//! use bible_commentary::parsing::reference::parse;
//! use bible_commentary::parsing::scan::scan;
//!
//! let passage = parse("Rom. 8:28-30", true).unwrap();
//! assert_eq!(passage.normalized_label(), "Romans 8:28-30");
//!
//! let found = scan("Compare Ps 23:1 with John 10:11.", None);
//! assert_eq!(found.len(), 2);
//! ```

pub mod records;
pub mod reference;
pub mod scan;
pub mod segment;
