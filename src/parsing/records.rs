//! Structured commentary records in JSON Lines form.
//!
//! Each non-blank line holds one excerpt object. Files ending in `.gz` are
//! decompressed on the fly. Lines that are not valid JSON objects are skipped
//! with a warning so one bad record does not discard a whole source.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::core::book::BookRegistry;
use crate::core::entry::{Granularity, NewEntry};
use crate::core::passage::Passage;
use crate::parsing::reference::parse;
use crate::parsing::scan::scan;
use crate::parsing::segment::MAX_PASSAGES_PER_SEGMENT;
use crate::utils::validation::{check_entry_limit, MAX_ENTRIES_PER_SOURCE};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Too many records (limit: {MAX_ENTRIES_PER_SOURCE})")]
    TooManyRecords,
}

/// One commentary excerpt as stored in a JSONL corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExcerptRecord {
    #[serde(default)]
    pub commentator: Option<String>,
    #[serde(default)]
    pub work: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub book: Option<String>,
    #[serde(default)]
    pub chapter_start: Option<u32>,
    #[serde(default)]
    pub chapter_end: Option<u32>,
    #[serde(default)]
    pub verse_start: Option<u32>,
    #[serde(default)]
    pub verse_end: Option<u32>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub coverage_label: Option<String>,
}

impl ExcerptRecord {
    /// Passages this record is keyed to.
    ///
    /// Structured fields take precedence, then the free-text `reference`
    /// (parsed leniently), then references scanned from the text itself with
    /// the record's `book` or `default_book` as the fallback book.
    #[must_use]
    pub fn passages(&self, default_book: Option<&str>) -> Vec<Passage> {
        if let Some(passage) = self.structured_passage() {
            return vec![passage];
        }
        if let Some(reference) = self.reference.as_deref() {
            if let Ok(passage) = parse(reference, false) {
                return vec![passage];
            }
        }
        let mut found = scan(&self.text, self.book.as_deref().or(default_book));
        found.truncate(MAX_PASSAGES_PER_SEGMENT);
        found
    }

    fn structured_passage(&self) -> Option<Passage> {
        let book_id = BookRegistry::canon().lookup(self.book.as_deref()?)?;
        let chapter_start = self.chapter_start?;
        let chapter_end = self.chapter_end.unwrap_or(chapter_start);
        let (verse_start, verse_end) = match (self.verse_start, self.verse_end) {
            (Some(vs), ve) => (Some(vs), Some(ve.unwrap_or(vs))),
            (None, _) => (None, None),
        };
        Passage::new(book_id, chapter_start, verse_start, chapter_end, verse_end).ok()
    }

    /// Build store entries for this record. Records with blank text or no
    /// resolvable passage yield nothing.
    #[must_use]
    pub fn to_entries(
        &self,
        commentator_key: &str,
        work_title: &str,
        default_book: Option<&str>,
    ) -> Vec<NewEntry> {
        if self.text.trim().is_empty() {
            return Vec::new();
        }
        let passages = self.passages(default_book);
        let single = passages.len() == 1;

        passages
            .iter()
            .map(|passage| {
                let mut entry = NewEntry::from_passage(commentator_key, work_title, passage, &self.text);
                if single {
                    // A stated granularity is kept only when it agrees with the
                    // shape of the passage (chapter vs verse-precise)
                    if let Some(stated) = self.granularity.as_deref().map(Granularity::parse) {
                        let chapter_shaped = passage.is_chapter_only();
                        let agrees = match stated {
                            Granularity::Chapter => chapter_shaped,
                            Granularity::Verse | Granularity::Range => !chapter_shaped,
                            Granularity::Unknown => false,
                        };
                        if agrees {
                            entry = entry.with_granularity(stated);
                        }
                    }
                    if let Some(label) = self.coverage_label.as_deref().filter(|l| !l.trim().is_empty()) {
                        entry = entry.with_label(label.trim());
                    }
                }
                entry
            })
            .collect()
    }
}

/// Read every JSON object line from a plain or gzip-compressed file
///
/// # Errors
///
/// Returns `RecordError::Io` if the file cannot be read and
/// `RecordError::TooManyRecords` past the per-source limit.
pub fn read_records(path: &Path) -> Result<Vec<ExcerptRecord>, RecordError> {
    read_records_from(open_text(path)?)
}

/// Read records from any buffered reader
///
/// # Errors
///
/// Returns `RecordError::Io` on read failure and
/// `RecordError::TooManyRecords` past the per-source limit.
pub fn read_records_from<R: BufRead>(reader: R) -> Result<Vec<ExcerptRecord>, RecordError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if check_entry_limit(records.len()).is_some() {
            return Err(RecordError::TooManyRecords);
        }
        match serde_json::from_str::<ExcerptRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = index + 1, "skipping malformed record: {e}"),
        }
    }
    Ok(records)
}

/// Read a whole text file, decompressing `.gz` and replacing invalid UTF-8
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn read_text(path: &Path) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    open_text(path)?.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".gz")
}

fn open_text(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
