use serde::{Deserialize, Serialize};

use crate::core::passage::Passage;
use crate::core::types::{BookId, EntryId, SourceId};
use crate::parsing::reference::ReferenceError;
use crate::utils::validation::normalize_excerpt;

/// How precisely an entry is keyed to scripture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// A single verse
    Verse,
    /// Several verses, possibly crossing chapters
    Range,
    /// One or more whole chapters
    Chapter,
    /// Anything else read back from storage
    Unknown,
}

impl Granularity {
    /// Derive the granularity implied by a passage
    #[must_use]
    pub fn of(passage: &Passage) -> Self {
        if passage.is_chapter_only() {
            Self::Chapter
        } else if passage.is_single_verse() {
            Self::Verse
        } else {
            Self::Range
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "verse" => Self::Verse,
            "range" => Self::Range,
            "chapter" => Self::Chapter,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verse => "verse",
            Self::Range => "range",
            Self::Chapter => "chapter",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upsert payload for a commentary source.
///
/// A source is identified by (commentator key, work title, local path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    pub commentator_key: String,
    pub work_title: String,
    pub source_url: String,
    pub local_raw_path: String,
    pub parser_name: String,
    pub parser_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Insert payload for one commentary excerpt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub commentator_key: String,
    pub work_title: String,
    pub book_id: BookId,
    pub chapter_start: u32,
    pub verse_start: Option<u32>,
    pub chapter_end: u32,
    pub verse_end: Option<u32>,
    pub granularity: Granularity,
    pub passage_label: String,
    pub excerpt: String,
    pub sort_chapter: u32,
    pub sort_verse: u32,
}

impl NewEntry {
    /// Key an excerpt to a passage, deriving granularity, label and sort keys.
    /// The excerpt is whitespace-collapsed and length-capped.
    pub fn from_passage(
        commentator_key: impl Into<String>,
        work_title: impl Into<String>,
        passage: &Passage,
        excerpt: &str,
    ) -> Self {
        Self {
            commentator_key: commentator_key.into(),
            work_title: work_title.into(),
            book_id: passage.book_id(),
            chapter_start: passage.chapter_start(),
            verse_start: passage.verse_start(),
            chapter_end: passage.chapter_end(),
            verse_end: passage.verse_end(),
            granularity: Granularity::of(passage),
            passage_label: passage.normalized_label(),
            excerpt: normalize_excerpt(excerpt),
            sort_chapter: passage.chapter_start(),
            sort_verse: passage.verse_start().unwrap_or(0),
        }
    }

    /// Override the derived granularity (e.g. when a corpus record states it)
    #[must_use]
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Override the derived coverage label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.passage_label = label.into();
        self
    }

    /// The passage covered by this entry
    ///
    /// # Errors
    ///
    /// Returns a `ReferenceError` if the chapter/verse fields do not form a
    /// valid passage.
    pub fn passage(&self) -> Result<Passage, ReferenceError> {
        Passage::new(
            self.book_id,
            self.chapter_start,
            self.verse_start,
            self.chapter_end,
            self.verse_end,
        )
    }
}

/// An entry read back from the store, joined with its source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEntry {
    pub id: EntryId,
    pub source_id: SourceId,
    pub commentator_key: String,
    pub work_title: String,
    pub book_id: BookId,
    pub chapter_start: u32,
    pub verse_start: Option<u32>,
    pub chapter_end: u32,
    pub verse_end: Option<u32>,
    pub granularity: Granularity,
    pub passage_label: String,
    pub excerpt: String,
    pub sort_chapter: u32,
    pub sort_verse: u32,
    pub source_url: String,
    pub local_raw_path: String,
}
