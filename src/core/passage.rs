use serde::Serialize;

use crate::core::book::BookRegistry;
use crate::core::types::BookId;
use crate::parsing::reference::ReferenceError;

/// Verse bound used for "to the end of the chapter" when a passage is split
/// per chapter. Verse counts per chapter are not known to the index.
pub const SPLIT_VERSE_END: u32 = 999;

/// A canonical scripture reference.
///
/// Either chapter-only (both verse bounds absent) or verse-precise (both
/// present). Always satisfies `chapter_end >= chapter_start` and, within a
/// single chapter, `verse_end >= verse_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Passage {
    book_id: BookId,
    book_name: &'static str,
    chapter_start: u32,
    verse_start: Option<u32>,
    chapter_end: u32,
    verse_end: Option<u32>,
}

impl Passage {
    /// Build a passage, validating the book and every range invariant.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::UnknownBook` for an id outside the canon,
    /// `ReferenceError::Malformed` when only one verse bound is given, and
    /// `ReferenceError::InvalidRange` for zero chapters/verses, a chapter past
    /// the end of the book, or an end before its start.
    pub fn new(
        book_id: BookId,
        chapter_start: u32,
        verse_start: Option<u32>,
        chapter_end: u32,
        verse_end: Option<u32>,
    ) -> Result<Self, ReferenceError> {
        let book = BookRegistry::canon()
            .get(book_id)
            .ok_or_else(|| ReferenceError::UnknownBook(format!("book id {book_id}")))?;

        if chapter_start == 0 || chapter_end == 0 {
            return Err(ReferenceError::InvalidRange(
                "chapter numbers start at 1".to_string(),
            ));
        }
        if chapter_end < chapter_start {
            return Err(ReferenceError::InvalidRange(format!(
                "ending chapter {chapter_end} is before starting chapter {chapter_start}"
            )));
        }
        if chapter_end > book.chapters {
            return Err(ReferenceError::InvalidRange(format!(
                "{} has {} chapter(s), got chapter {chapter_end}",
                book.name, book.chapters
            )));
        }

        match (verse_start, verse_end) {
            (None, None) => {}
            (Some(vs), Some(ve)) => {
                if vs == 0 || ve == 0 {
                    return Err(ReferenceError::InvalidRange(
                        "verse numbers start at 1".to_string(),
                    ));
                }
                if chapter_start == chapter_end && ve < vs {
                    return Err(ReferenceError::InvalidRange(format!(
                        "ending verse {ve} is before starting verse {vs}"
                    )));
                }
            }
            _ => {
                return Err(ReferenceError::Malformed(
                    "verse bounds must both be present or both absent".to_string(),
                ))
            }
        }

        Ok(Self {
            book_id,
            book_name: book.name,
            chapter_start,
            verse_start,
            chapter_end,
            verse_end,
        })
    }

    /// A whole chapter, e.g. "Psalms 23"
    ///
    /// # Errors
    ///
    /// See [`Passage::new`].
    pub fn chapter(book_id: BookId, chapter: u32) -> Result<Self, ReferenceError> {
        Self::new(book_id, chapter, None, chapter, None)
    }

    /// A chapter range without verses, e.g. "Romans 8-9"
    ///
    /// # Errors
    ///
    /// See [`Passage::new`].
    pub fn chapters(book_id: BookId, start: u32, end: u32) -> Result<Self, ReferenceError> {
        Self::new(book_id, start, None, end, None)
    }

    /// A single verse, e.g. "Romans 8:28"
    ///
    /// # Errors
    ///
    /// See [`Passage::new`].
    pub fn verse(book_id: BookId, chapter: u32, verse: u32) -> Result<Self, ReferenceError> {
        Self::new(book_id, chapter, Some(verse), chapter, Some(verse))
    }

    /// A verse range inside one chapter, e.g. "Romans 8:28-30"
    ///
    /// # Errors
    ///
    /// See [`Passage::new`].
    pub fn verses(
        book_id: BookId,
        chapter: u32,
        start: u32,
        end: u32,
    ) -> Result<Self, ReferenceError> {
        Self::new(book_id, chapter, Some(start), chapter, Some(end))
    }

    #[must_use]
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    #[must_use]
    pub fn book_name(&self) -> &'static str {
        self.book_name
    }

    #[must_use]
    pub fn chapter_start(&self) -> u32 {
        self.chapter_start
    }

    #[must_use]
    pub fn chapter_end(&self) -> u32 {
        self.chapter_end
    }

    #[must_use]
    pub fn verse_start(&self) -> Option<u32> {
        self.verse_start
    }

    #[must_use]
    pub fn verse_end(&self) -> Option<u32> {
        self.verse_end
    }

    #[must_use]
    pub fn is_chapter_only(&self) -> bool {
        self.verse_start.is_none() && self.verse_end.is_none()
    }

    #[must_use]
    pub fn is_single_chapter(&self) -> bool {
        self.chapter_start == self.chapter_end
    }

    #[must_use]
    pub fn is_single_verse(&self) -> bool {
        self.is_single_chapter() && !self.is_chapter_only() && self.verse_start == self.verse_end
    }

    /// Render the canonical text form: "Psalms 23", "Romans 8-9",
    /// "Romans 8:28", "Romans 8:28-30", "Romans 8:28-9:5".
    #[must_use]
    pub fn normalized_label(&self) -> String {
        let name = self.book_name;
        let (cs, ce) = (self.chapter_start, self.chapter_end);
        match (self.verse_start, self.verse_end) {
            (Some(vs), Some(ve)) if cs == ce && vs == ve => format!("{name} {cs}:{vs}"),
            (Some(vs), Some(ve)) if cs == ce => format!("{name} {cs}:{vs}-{ve}"),
            (Some(vs), Some(ve)) => format!("{name} {cs}:{vs}-{ce}:{ve}"),
            _ if cs == ce => format!("{name} {cs}"),
            _ => format!("{name} {cs}-{ce}"),
        }
    }

    /// True when both passages cover at least one common chapter, and, for two
    /// verse-precise passages confined to the same single chapter, at least one
    /// common verse.
    #[must_use]
    pub fn overlaps(&self, other: &Passage) -> bool {
        if self.book_id != other.book_id {
            return false;
        }
        if self.chapter_end < other.chapter_start || other.chapter_end < self.chapter_start {
            return false;
        }
        if self.is_chapter_only() || other.is_chapter_only() {
            return true;
        }
        if self.is_single_chapter()
            && other.is_single_chapter()
            && self.chapter_start == other.chapter_start
        {
            if let (Some(a1), Some(a2), Some(b1), Some(b2)) = (
                self.verse_start,
                self.verse_end,
                other.verse_start,
                other.verse_end,
            ) {
                return !(a2 < b1 || b2 < a1);
            }
        }
        true
    }

    /// Split into one passage per chapter. Verse bounds are clipped to the first
    /// and last chapter; interior chapters run from verse 1 to
    /// [`SPLIT_VERSE_END`].
    #[must_use]
    pub fn split_by_chapter(&self) -> Vec<Passage> {
        if self.is_single_chapter() {
            return vec![*self];
        }

        (self.chapter_start..=self.chapter_end)
            .map(|chapter| {
                let (verse_start, verse_end) = if self.is_chapter_only() {
                    (None, None)
                } else {
                    let start = if chapter == self.chapter_start {
                        self.verse_start
                    } else {
                        Some(1)
                    };
                    let end = if chapter == self.chapter_end {
                        self.verse_end
                    } else {
                        Some(SPLIT_VERSE_END)
                    };
                    (start, end)
                };
                Passage {
                    chapter_start: chapter,
                    chapter_end: chapter,
                    verse_start,
                    verse_end,
                    ..*self
                }
            })
            .collect()
    }
}

impl std::fmt::Display for Passage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROMANS: BookId = BookId(45);
    const PSALMS: BookId = BookId(19);

    #[test]
    fn test_normalized_labels() {
        assert_eq!(Passage::chapter(PSALMS, 23).unwrap().normalized_label(), "Psalms 23");
        assert_eq!(Passage::chapters(ROMANS, 8, 9).unwrap().normalized_label(), "Romans 8-9");
        assert_eq!(Passage::verse(ROMANS, 8, 28).unwrap().normalized_label(), "Romans 8:28");
        assert_eq!(
            Passage::verses(ROMANS, 8, 28, 30).unwrap().normalized_label(),
            "Romans 8:28-30"
        );
        let cross = Passage::new(ROMANS, 8, Some(28), 9, Some(5)).unwrap();
        assert_eq!(cross.normalized_label(), "Romans 8:28-9:5");
        assert_eq!(cross.to_string(), "Romans 8:28-9:5");
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(matches!(
            Passage::chapters(ROMANS, 9, 8),
            Err(ReferenceError::InvalidRange(_))
        ));
        assert!(matches!(
            Passage::verses(ROMANS, 8, 30, 28),
            Err(ReferenceError::InvalidRange(_))
        ));
        assert!(matches!(
            Passage::chapter(ROMANS, 0),
            Err(ReferenceError::InvalidRange(_))
        ));
        assert!(matches!(
            Passage::new(ROMANS, 8, Some(28), 8, None),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            Passage::chapter(BookId(67), 1),
            Err(ReferenceError::UnknownBook(_))
        ));
        // Romans has 16 chapters
        assert!(matches!(
            Passage::chapter(ROMANS, 17),
            Err(ReferenceError::InvalidRange(_))
        ));
        // A later chapter may end on a lower verse number
        assert!(Passage::new(ROMANS, 8, Some(28), 9, Some(5)).is_ok());
    }

    #[test]
    fn test_overlaps() {
        let verse = Passage::verse(ROMANS, 8, 28).unwrap();
        let range = Passage::verses(ROMANS, 8, 26, 30).unwrap();
        let later = Passage::verses(ROMANS, 8, 31, 39).unwrap();
        let chapter = Passage::chapter(ROMANS, 8).unwrap();
        let other_book = Passage::verse(PSALMS, 8, 28).unwrap();

        assert!(verse.overlaps(&range));
        assert!(!verse.overlaps(&later));
        assert!(chapter.overlaps(&later));
        assert!(!verse.overlaps(&other_book));
        assert!(!Passage::chapter(ROMANS, 9).unwrap().overlaps(&verse));
    }

    #[test]
    fn test_split_by_chapter_clips_verse_bounds() {
        let cross = Passage::new(ROMANS, 7, Some(20), 9, Some(5)).unwrap();
        let parts = cross.split_by_chapter();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].normalized_label(), "Romans 7:20-999");
        assert_eq!(parts[1].normalized_label(), "Romans 8:1-999");
        assert_eq!(parts[2].normalized_label(), "Romans 9:1-5");
    }

    #[test]
    fn test_split_chapter_range_stays_chapter_only() {
        let parts = Passage::chapters(PSALMS, 22, 24).unwrap().split_by_chapter();
        let labels: Vec<String> = parts.iter().map(Passage::normalized_label).collect();
        assert_eq!(labels, vec!["Psalms 22", "Psalms 23", "Psalms 24"]);
        assert!(parts.iter().all(Passage::is_chapter_only));
    }

    #[test]
    fn test_split_single_chapter_is_identity() {
        let range = Passage::verses(ROMANS, 8, 28, 30).unwrap();
        assert_eq!(range.split_by_chapter(), vec![range]);
    }
}
