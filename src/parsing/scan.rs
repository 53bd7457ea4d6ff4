use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::core::book::BookRegistry;
use crate::core::passage::Passage;
use crate::core::types::BookId;

/// `[Book ]C:V[-[C2:]V2]` anywhere in running text
static SCAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:(?P<book>[1-3]?\s*[A-Za-z][A-Za-z. ]+?)\s+)?",
        r"(?P<ch>[0-9]{1,3}):(?P<v1>[0-9]{1,3})",
        r"(?:-(?:(?P<ch2>[0-9]{1,3}):)?(?P<v2>[0-9]{1,3}))?\b",
    ))
    .expect("scan grammar is a valid regex")
});

/// Find every verse reference embedded in a line of prose.
///
/// Matches are leftmost and non-overlapping. A match without a book name takes
/// `default_book`; a match whose book cannot be resolved, or whose range is
/// invalid, is skipped. Unlike [`crate::parsing::reference::parse`] this never
/// fails: partial recall over uncontrolled text is acceptable.
#[must_use]
pub fn scan(text: &str, default_book: Option<&str>) -> Vec<Passage> {
    let registry = BookRegistry::canon();
    let default_id = default_book.and_then(|b| registry.lookup(b));

    SCAN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let passage = passage_from_match(&caps, default_id);
            if passage.is_none() {
                trace!(fragment = &caps[0], "skipping unresolved reference");
            }
            passage
        })
        .collect()
}

fn passage_from_match(caps: &Captures<'_>, default_id: Option<BookId>) -> Option<Passage> {
    let book_id = match caps.name("book") {
        Some(phrase) => resolve_phrase(phrase.as_str())?,
        None => default_id?,
    };

    let c1: u32 = caps["ch"].parse().ok()?;
    let v1: u32 = caps["v1"].parse().ok()?;
    let c2 = match caps.name("ch2") {
        Some(m) => m.as_str().parse().ok()?,
        None => c1,
    };
    let v2 = match caps.name("v2") {
        Some(m) => m.as_str().parse().ok()?,
        None => v1,
    };

    Passage::new(book_id, c1, Some(v1), c2, Some(v2)).ok()
}

/// The captured phrase may carry leading prose ("see Romans"); try the whole
/// phrase first, then each shorter word suffix.
fn resolve_phrase(phrase: &str) -> Option<BookId> {
    let registry = BookRegistry::canon();
    let words: Vec<&str> = phrase.split_whitespace().collect();
    (0..words.len()).find_map(|start| registry.lookup(&words[start..].join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(passages: &[Passage]) -> Vec<String> {
        passages.iter().map(Passage::normalized_label).collect()
    }

    #[test]
    fn test_scan_finds_references_mid_line() {
        let text = "As Paul says in Romans 8:28, and again at 1 Cor. 13:4-7, love endures.";
        assert_eq!(
            labels(&scan(text, None)),
            vec!["Romans 8:28", "1 Corinthians 13:4-7"]
        );
    }

    #[test]
    fn test_scan_uses_default_book() {
        let text = "3:16 shows the love of God; (3:17-18) continues it.";
        let found = scan(text, Some("John"));
        assert_eq!(labels(&found), vec!["John 3:16", "John 3:17-18"]);

        // A leading word that is not a book hides the default
        assert!(scan("compare 3:17", Some("John")).is_empty());

        let bare = scan("3:16 For God so loved the world", Some("John"));
        assert_eq!(labels(&bare), vec!["John 3:16"]);
    }

    #[test]
    fn test_scan_without_default_skips_bare_references() {
        assert!(scan("3:16 For God so loved the world", None).is_empty());
        assert!(scan("3:16 For God so loved the world", Some("Nonsense")).is_empty());
    }

    #[test]
    fn test_scan_cross_chapter() {
        let found = scan("The argument of Romans 8:28-9:5 continues.", None);
        assert_eq!(labels(&found), vec!["Romans 8:28-9:5"]);
    }

    #[test]
    fn test_scan_skips_invalid_and_unknown() {
        let text = "Hezekiah 3:16 is no book, Romans 8:30-28 is backwards, Psalm 23:1 is fine.";
        assert_eq!(labels(&scan(text, None)), vec!["Psalms 23:1"]);
    }

    #[test]
    fn test_scan_multiple_on_one_line() {
        let text = "Gen 1:1; Exod 3:14; John 1:1-3";
        assert_eq!(
            labels(&scan(text, None)),
            vec!["Genesis 1:1", "Exodus 3:14", "John 1:1-3"]
        );
    }

    #[test]
    fn test_scan_empty_text() {
        assert!(scan("", Some("Romans")).is_empty());
        assert!(scan("no references here", Some("Romans")).is_empty());
    }
}
