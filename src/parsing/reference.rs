use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::core::book::{Book, BookRegistry};
use crate::core::passage::Passage;
use crate::utils::validation::MAX_REFERENCE_LENGTH;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Unknown Bible book: {0:?}")]
    UnknownBook(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Ambiguous chapter/verse range: {0}")]
    AmbiguousReference(String),

    #[error("Could not parse passage reference: {0}")]
    Malformed(String),
}

/// `Book C[:V][-[C2:]V2]` anchored to the whole input
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<book>[1-3]?\s*[A-Za-z][A-Za-z. ]+?)\s+",
        r"(?P<c1>[0-9]+)",
        r"(?::(?P<v1>[0-9]+))?",
        r"(?:\s*(?P<dash>[-\u{2013}])\s*(?:(?P<c2>[0-9]+):)?(?P<v2>[0-9]+)?)?",
        r"\s*$",
    ))
    .expect("reference grammar is a valid regex")
});

/// Parse a human-written reference into a canonical passage.
///
/// Accepted forms, in priority order:
///
/// | Form | Example | Result |
/// |------|---------|--------|
/// | `Book C:V` | `Romans 8:28` | single verse |
/// | `Book C:V-V2` | `Romans 8:28-30` | verse range in one chapter |
/// | `Book C:V-C2:V2` | `Romans 8:28-9:5` | verse range across chapters |
/// | `Book C-C2` | `Romans 8-9` | chapter range (not strict) |
/// | `Book C` | `Psalm 23` | whole chapter |
///
/// `Book C-N` has no colon, so `John 3-16` may be chapters 3 to 16 or verse
/// 3:16. In `strict` mode every such reference is `AmbiguousReference`.
/// Otherwise it is a chapter range when the book has at least `N` chapters
/// and the verse `C:N` when it does not (`John 3-36`).
/// `Book C-C2:V2` (chapter start, verse end) is also ambiguous in strict mode
/// and read as the chapter range `C-C2` when not strict.
///
/// # Errors
///
/// Returns `ReferenceError::Malformed` if the text does not fit the grammar,
/// `ReferenceError::UnknownBook` if the book is not in the canon,
/// `ReferenceError::InvalidRange` if an end precedes its start, and
/// `ReferenceError::AmbiguousReference` for the ambiguous forms in strict mode.
pub fn parse(text: &str, strict: bool) -> Result<Passage, ReferenceError> {
    if text.len() > MAX_REFERENCE_LENGTH {
        return Err(ReferenceError::Malformed(format!(
            "reference exceeds {MAX_REFERENCE_LENGTH} bytes"
        )));
    }

    let caps = REFERENCE_RE
        .captures(text)
        .ok_or_else(|| ReferenceError::Malformed(format!("{:?}", text.trim())))?;

    let book_phrase = &caps["book"];
    let book = BookRegistry::canon()
        .find(book_phrase)
        .ok_or_else(|| ReferenceError::UnknownBook(book_phrase.trim().to_string()))?;

    let c1 = number(&caps, "c1")?.unwrap_or_default();
    let v1 = number(&caps, "v1")?;
    let c2 = number(&caps, "c2")?;
    let v2 = number(&caps, "v2")?;
    let dash = caps.name("dash").is_some();

    match (v1, c2, v2) {
        (None, None, None) if !dash => Passage::chapter(book.id, c1),
        (None, None, Some(end)) => chapter_dash_number(book, c1, end, strict, text),
        (None, Some(end_chapter), Some(_)) => {
            if strict {
                Err(ReferenceError::AmbiguousReference(format!(
                    "{:?} mixes a chapter start with a verse end; use {} {c1}:1-{end_chapter}:V or {} {c1}-{end_chapter}",
                    text.trim(),
                    book.name,
                    book.name
                )))
            } else {
                Passage::chapters(book.id, c1, end_chapter)
            }
        }
        (Some(verse), None, None) if !dash => Passage::verse(book.id, c1, verse),
        (Some(start), None, Some(end)) => Passage::verses(book.id, c1, start, end),
        (Some(start), Some(end_chapter), Some(end)) => {
            Passage::new(book.id, c1, Some(start), end_chapter, Some(end))
        }
        _ => Err(ReferenceError::Malformed(format!(
            "{:?} has an incomplete range",
            text.trim()
        ))),
    }
}

/// Resolve `Book C-N` (no colon anywhere).
///
/// Without a colon the dash may join two chapters or a chapter and a verse
/// ("John 3-16"), so strict mode rejects the form outright. Otherwise it is a
/// chapter range when the book has at least `N` chapters and verse `C:N`
/// when it does not.
fn chapter_dash_number(
    book: &Book,
    chapter: u32,
    n: u32,
    strict: bool,
    text: &str,
) -> Result<Passage, ReferenceError> {
    if n < chapter {
        return Err(ReferenceError::InvalidRange(format!(
            "ending chapter {n} is before starting chapter {chapter}"
        )));
    }
    if strict {
        return Err(ReferenceError::AmbiguousReference(format!(
            "{:?} could be chapters or a verse; use {} {chapter}:{n} for the verse",
            text.trim(),
            book.name
        )));
    }
    if n <= book.chapters {
        return Passage::chapters(book.id, chapter, n);
    }
    Passage::verse(book.id, chapter, n)
}

/// Parse a fully-qualified verse key of the form `translation:Book:Chapter:Verse`
/// (e.g. `kjv:Genesis:1:1`), as used by verse-indexed translation data.
///
/// # Errors
///
/// Returns `ReferenceError::Malformed` for fewer than four fields or
/// non-numeric chapter/verse, `ReferenceError::UnknownBook` for an unknown
/// book, and `ReferenceError::InvalidRange` for out-of-range numbers.
pub fn parse_qualified_ref(reference: &str) -> Result<Passage, ReferenceError> {
    let parts: Vec<&str> = reference.split(':').collect();
    if parts.len() < 4 {
        return Err(ReferenceError::Malformed(format!(
            "unsupported verse key format: {reference:?}"
        )));
    }

    let book_id = BookRegistry::canon()
        .lookup(parts[1])
        .ok_or_else(|| ReferenceError::UnknownBook(parts[1].trim().to_string()))?;
    let chapter = parse_number(parts[2])?;
    let verse = parse_number(parts[3])?;

    Passage::verse(book_id, chapter, verse)
}

fn number(caps: &Captures<'_>, name: &str) -> Result<Option<u32>, ReferenceError> {
    caps.name(name).map(|m| parse_number(m.as_str())).transpose()
}

fn parse_number(s: &str) -> Result<u32, ReferenceError> {
    s.trim()
        .parse()
        .map_err(|_| ReferenceError::Malformed(format!("invalid number: {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BookId;

    fn bounds(p: &Passage) -> (u32, Option<u32>, u32, Option<u32>) {
        (p.chapter_start(), p.verse_start(), p.chapter_end(), p.verse_end())
    }

    #[test]
    fn test_single_verse() {
        let p = parse("Romans 8:28", true).unwrap();
        assert_eq!(p.book_name(), "Romans");
        assert_eq!(bounds(&p), (8, Some(28), 8, Some(28)));
    }

    #[test]
    fn test_range_same_chapter() {
        let p = parse("Romans 8:28-30", true).unwrap();
        assert_eq!(bounds(&p), (8, Some(28), 8, Some(30)));

        let spaced = parse("Rom. 8:28 - 30", true).unwrap();
        assert_eq!(spaced, p);
    }

    #[test]
    fn test_cross_chapter_range() {
        let p = parse("Romans 8:28-9:5", true).unwrap();
        assert_eq!(bounds(&p), (8, Some(28), 9, Some(5)));
    }

    #[test]
    fn test_chapter_only() {
        let p = parse("Psalm 23", true).unwrap();
        assert!(p.is_chapter_only());
        assert_eq!(p.normalized_label(), "Psalms 23");
    }

    #[test]
    fn test_chapter_range() {
        let p = parse("Romans 8-9", false).unwrap();
        assert!(p.is_chapter_only());
        assert_eq!(bounds(&p), (8, None, 9, None));
    }

    #[test]
    fn test_book_aliases() {
        assert_eq!(parse("1 Cor. 13:4", true).unwrap().book_id(), BookId(46));
        assert_eq!(parse("I Corinthians 13:4", true).unwrap().book_id(), BookId(46));
        assert_eq!(parse("Song of Solomon 2:1", true).unwrap().book_id(), BookId(22));
        assert_eq!(parse("  iii john 1:4 ", true).unwrap().book_id(), BookId(64));
    }

    #[test]
    fn test_unknown_book() {
        assert!(matches!(
            parse("Hezekiah 3:16", true),
            Err(ReferenceError::UnknownBook(_))
        ));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(parse("Romans 9-8", false), Err(ReferenceError::InvalidRange(_))));
        assert!(matches!(parse("Romans 9:1-8:5", false), Err(ReferenceError::InvalidRange(_))));
        assert!(matches!(parse("Romans 8:30-28", false), Err(ReferenceError::InvalidRange(_))));
        assert!(matches!(parse("Romans 0:1", false), Err(ReferenceError::InvalidRange(_))));
    }

    #[test]
    fn test_chapter_dash_verse_is_ambiguous_in_strict_mode() {
        for text in ["John 3-16", "John 3-36", "Romans 8-9", "John 3-3"] {
            assert!(
                matches!(parse(text, true), Err(ReferenceError::AmbiguousReference(_))),
                "expected AmbiguousReference for {text:?}"
            );
        }

        // Lenient: a chapter range while the book has that many chapters,
        // otherwise a verse (John has 21 chapters)
        assert_eq!(parse("John 3-16", false).unwrap().normalized_label(), "John 3-16");
        assert_eq!(parse("John 3-36", false).unwrap().normalized_label(), "John 3:36");

        // Still an invalid range before any ambiguity
        assert!(matches!(parse("John 16-3", true), Err(ReferenceError::InvalidRange(_))));

        assert!(matches!(
            parse("John 3-4:2", true),
            Err(ReferenceError::AmbiguousReference(_))
        ));
        assert_eq!(parse("John 3-4:2", false).unwrap().normalized_label(), "John 3-4");
    }

    #[test]
    fn test_malformed() {
        for text in ["", "Romans", "8:28", "Romans 8:", "Romans 8:28-", "Romans 8:28-9:", "Romans eight"] {
            assert!(
                matches!(parse(text, false), Err(ReferenceError::Malformed(_))),
                "expected Malformed for {text:?}"
            );
        }
        let long = format!("Romans {}", "1".repeat(MAX_REFERENCE_LENGTH));
        assert!(matches!(parse(&long, false), Err(ReferenceError::Malformed(_))));
        assert!(matches!(parse("Romans 99999999999:1", false), Err(ReferenceError::Malformed(_))));
    }

    #[test]
    fn test_normalized_label_round_trip() {
        let registry = BookRegistry::canon();
        for book in registry.books() {
            let last = book.chapters;
            let cross_end = if last == 1 { 20 } else { 2 };
            let samples = [
                Passage::chapter(book.id, 1).unwrap(),
                Passage::chapter(book.id, last).unwrap(),
                Passage::chapters(book.id, 1, last).unwrap(),
                Passage::verse(book.id, last, 7).unwrap(),
                Passage::verses(book.id, 1, 3, 999).unwrap(),
                Passage::new(book.id, 1, Some(12), last, Some(cross_end)).unwrap(),
            ];
            for p in samples {
                assert_eq!(parse(&p.normalized_label(), false).unwrap(), p, "{p}");
                // Chapter ranges are written "C-C2", which strict mode rejects
                let chapter_range = p.is_chapter_only() && !p.is_single_chapter();
                if !chapter_range {
                    assert_eq!(parse(&p.normalized_label(), true).unwrap(), p, "{p}");
                }
            }
        }
    }

    #[test]
    fn test_parse_qualified_ref() {
        let p = parse_qualified_ref("kjv:Genesis:1:1").unwrap();
        assert_eq!(p.normalized_label(), "Genesis 1:1");
        assert!(p.is_single_verse());

        let p = parse_qualified_ref("web:1 John:4:8:extra").unwrap();
        assert_eq!(p.normalized_label(), "1 John 4:8");

        assert!(matches!(parse_qualified_ref("kjv:Genesis:1"), Err(ReferenceError::Malformed(_))));
        assert!(matches!(parse_qualified_ref("kjv:Nope:1:1"), Err(ReferenceError::UnknownBook(_))));
        assert!(matches!(parse_qualified_ref("kjv:Genesis:x:1"), Err(ReferenceError::Malformed(_))));
    }
}
