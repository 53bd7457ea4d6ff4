//! Line-oriented segmentation of plain-text commentary.
//!
//! Commentary files without structured passage keys are split into excerpts
//! by looking for reference-bearing lines. Each such line opens an excerpt
//! that runs for a few following lines, stopping early at the next line that
//! carries its own reference.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::book::BookRegistry;
use crate::core::passage::Passage;
use crate::core::types::BookId;
use crate::parsing::scan::scan;

/// Lines per excerpt, including the opening line
pub const MAX_SEGMENT_LINES: usize = 8;

/// Passages an excerpt may be keyed to; extra references on a line are ignored
pub const MAX_PASSAGES_PER_SEGMENT: usize = 3;

/// Lines taken for a whole-source fallback excerpt
pub const FALLBACK_LINES: usize = 12;

static CHAPTER_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:psalm|chapter)\s+([0-9]{1,3})\b").expect("heading regex is valid")
});

static VERSE_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bverse\s+([0-9]{1,3})\b").expect("heading regex is valid"));

static TITLE_BOOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:commentary on|exposition of)\s+([1-3]?\s*[A-Za-z]+(?: [A-Za-z]+)*)")
        .expect("title regex is valid")
});

static FILENAME_CHAPTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:psalm|ps|chapter|ch)[-_ ]?([0-9]{1,3})").expect("filename regex is valid")
});

/// One excerpt and the passages it is keyed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub passages: Vec<Passage>,
    pub excerpt: String,
}

/// Scope used to resolve book-less references and bare headings
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentScope {
    pub book: Option<BookId>,
    pub chapter: Option<u32>,
}

impl SegmentScope {
    /// Resolve a book name; an unknown name yields an empty scope book
    #[must_use]
    pub fn new(book: Option<&str>, chapter: Option<u32>) -> Self {
        Self {
            book: book.and_then(|b| BookRegistry::canon().lookup(b)),
            chapter,
        }
    }

    fn book_name(&self) -> Option<&'static str> {
        self.book
            .and_then(|id| BookRegistry::canon().get(id))
            .map(|b| b.name)
    }
}

/// Split commentary text into reference-keyed excerpts.
///
/// When nothing in the text can be keyed and the scope names a book, a single
/// chapter-level excerpt is produced from the first [`FALLBACK_LINES`] lines
/// (the scope chapter, or chapter 1).
#[must_use]
pub fn segment_text(text: &str, scope: &SegmentScope) -> Vec<Segment> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let default_book = scope.book_name();

    let mut segments = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let mut found = scan(line, default_book);
        if found.is_empty() {
            found = heading_passage(line, scope).into_iter().collect();
        }
        if found.is_empty() {
            continue;
        }

        let mut excerpt_lines = vec![*line];
        for next in lines.iter().skip(i + 1).take(MAX_SEGMENT_LINES - 1) {
            if !scan(next, default_book).is_empty() {
                break;
            }
            excerpt_lines.push(next);
        }

        found.truncate(MAX_PASSAGES_PER_SEGMENT);
        segments.push(Segment {
            passages: found,
            excerpt: excerpt_lines.join(" "),
        });
    }

    if segments.is_empty() {
        if let Some(book) = scope.book {
            if let Ok(passage) = Passage::chapter(book, scope.chapter.unwrap_or(1)) {
                segments.push(Segment {
                    passages: vec![passage],
                    excerpt: lines
                        .iter()
                        .take(FALLBACK_LINES)
                        .copied()
                        .collect::<Vec<_>>()
                        .join("\n"),
                });
            }
        }
    }
    segments
}

/// A single chapter-level excerpt built from the first [`MAX_SEGMENT_LINES`]
/// lines. Returns `None` unless the scope names both a book and a chapter.
#[must_use]
pub fn chapter_segment(text: &str, scope: &SegmentScope) -> Option<Segment> {
    let passage = Passage::chapter(scope.book?, scope.chapter?).ok()?;
    let excerpt = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(MAX_SEGMENT_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    Some(Segment {
        passages: vec![passage],
        excerpt,
    })
}

/// "Chapter 5" / "Psalm 23" headings need a scope book; "Verse 3" headings
/// need a scope book and chapter.
fn heading_passage(line: &str, scope: &SegmentScope) -> Option<Passage> {
    let book = scope.book?;
    if let Some(caps) = CHAPTER_HEADING_RE.captures(line) {
        let chapter = caps[1].parse().ok()?;
        return Passage::chapter(book, chapter).ok();
    }
    let caps = VERSE_HEADING_RE.captures(line)?;
    let verse = caps[1].parse().ok()?;
    Passage::verse(book, scope.chapter?, verse).ok()
}

/// Guess the book a whole source discusses from its titles or opening text.
///
/// Psalm-themed titles map to Psalms; otherwise a "Commentary on X" or
/// "Exposition of X" phrase near the top of the text is tried.
#[must_use]
pub fn infer_default_book(work_title: &str, commentator_key: &str, text: &str) -> Option<BookId> {
    let registry = BookRegistry::canon();
    if [work_title, commentator_key]
        .iter()
        .any(|t| t.to_lowercase().contains("psalm"))
    {
        return registry.lookup("Psalms");
    }

    let head: String = text.chars().take(1000).collect();
    let caps = TITLE_BOOK_RE.captures(&head)?;
    let words: Vec<&str> = caps[1].split_whitespace().collect();
    // Longest leading word run that names a book ("Romans with notes" -> "Romans")
    (1..=words.len())
        .rev()
        .find_map(|n| registry.lookup(&words[..n].join(" ")))
}

/// Chapter number embedded in a file name such as `psalm-23.txt` or `ch_5.txt`
#[must_use]
pub fn chapter_from_filename(name: &str) -> Option<u32> {
    FILENAME_CHAPTER_RE
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(segment: &Segment) -> Vec<String> {
        segment.passages.iter().map(Passage::normalized_label).collect()
    }

    #[test]
    fn test_segment_stops_at_next_reference() {
        let text = "\
Romans 8:28 And we know that all things work together.
The called are those whom God has purposed.

Romans 8:29 For whom he did foreknow.
He also did predestinate.
";
        let segments = segment_text(text, &SegmentScope::default());
        assert_eq!(segments.len(), 2);
        assert_eq!(labels(&segments[0]), vec!["Romans 8:28"]);
        assert_eq!(
            segments[0].excerpt,
            "Romans 8:28 And we know that all things work together. The called are those whom God has purposed."
        );
        assert_eq!(labels(&segments[1]), vec!["Romans 8:29"]);
    }

    #[test]
    fn test_segment_caps_lines() {
        let mut text = String::from("John 1:1 In the beginning\n");
        for i in 0..20 {
            text.push_str(&format!("line {i}\n"));
        }
        let segments = segment_text(&text, &SegmentScope::default());
        assert_eq!(segments.len(), 1);
        assert!(segments[0].excerpt.ends_with("line 6"));
    }

    #[test]
    fn test_segment_caps_passages_per_line() {
        let text = "Gen 1:1; Gen 1:2; Gen 1:3; Gen 1:4 all speak of creation";
        let segments = segment_text(text, &SegmentScope::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].passages.len(), MAX_PASSAGES_PER_SEGMENT);
    }

    #[test]
    fn test_segment_headings_with_scope() {
        let text = "Chapter 23\nThe Lord is my shepherd.\nVerse 4\nThe valley of the shadow.";
        let scope = SegmentScope::new(Some("Psalms"), Some(23));
        let segments = segment_text(text, &scope);
        assert_eq!(segments.len(), 2);
        assert_eq!(labels(&segments[0]), vec!["Psalms 23"]);
        // Headings do not stop the previous excerpt, only scanned references do
        assert!(segments[0].excerpt.contains("Verse 4"));
        assert_eq!(labels(&segments[1]), vec!["Psalms 23:4"]);
    }

    #[test]
    fn test_verse_heading_needs_chapter() {
        let scope = SegmentScope::new(Some("Psalms"), None);
        let segments = segment_text("Verse 4\nThe valley.", &scope);
        // Falls back to a chapter-1 excerpt
        assert_eq!(segments.len(), 1);
        assert_eq!(labels(&segments[0]), vec!["Psalms 1"]);
    }

    #[test]
    fn test_segment_fallback() {
        let scope = SegmentScope::new(Some("Jude"), None);
        let segments = segment_text("An introduction without references.", &scope);
        assert_eq!(segments.len(), 1);
        assert_eq!(labels(&segments[0]), vec!["Jude 1"]);

        assert!(segment_text("No scope, no references.", &SegmentScope::default()).is_empty());
    }

    #[test]
    fn test_chapter_segment() {
        let scope = SegmentScope::new(Some("Psalm"), Some(23));
        let segment = chapter_segment("A\n\nB\nC", &scope).unwrap();
        assert_eq!(labels(&segment), vec!["Psalms 23"]);
        assert_eq!(segment.excerpt, "A\nB\nC");

        assert!(chapter_segment("A", &SegmentScope::new(Some("Psalm"), None)).is_none());
        assert!(chapter_segment("A", &SegmentScope::new(Some("Jude"), Some(2))).is_none());
    }

    #[test]
    fn test_infer_default_book() {
        assert_eq!(infer_default_book("Treasury of David (Psalms)", "spurgeon", ""), Some(BookId(19)));
        assert_eq!(
            infer_default_book("Works", "calvin", "A Commentary on Romans with notes"),
            Some(BookId(45))
        );
        assert_eq!(
            infer_default_book("Works", "calvin", "Exposition of 1 Corinthians"),
            Some(BookId(46))
        );
        assert_eq!(infer_default_book("Works", "calvin", "Sermons"), None);
    }

    #[test]
    fn test_chapter_from_filename() {
        assert_eq!(chapter_from_filename("psalm-23.txt"), Some(23));
        assert_eq!(chapter_from_filename("gill_ch_5.txt"), Some(5));
        assert_eq!(chapter_from_filename("Chapter12.html"), Some(12));
        assert_eq!(chapter_from_filename("romans.txt"), None);
    }
}
