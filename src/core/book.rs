use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::core::types::BookId;

/// (OSIS code, display name, chapter count, abbreviations)
type BookDef = (&'static str, &'static str, u32, &'static [&'static str]);

/// The 66-book Protestant canon in canonical order
const CANON: [BookDef; 66] = [
    ("Gen", "Genesis", 50, &["gen", "ge", "gn", "genesis"]),
    ("Exod", "Exodus", 40, &["exod", "ex", "exo", "exodus"]),
    ("Lev", "Leviticus", 27, &["lev", "le", "lv", "leviticus"]),
    ("Num", "Numbers", 36, &["num", "nu", "nm", "numbers"]),
    ("Deut", "Deuteronomy", 34, &["deut", "dt", "deuteronomy"]),
    ("Josh", "Joshua", 24, &["josh", "jos", "joshua"]),
    ("Judg", "Judges", 21, &["judg", "jg", "jdg", "judges"]),
    ("Ruth", "Ruth", 4, &["ruth", "ru"]),
    ("1Sam", "1 Samuel", 31, &["1 samuel", "1 sam", "1sa", "first samuel"]),
    ("2Sam", "2 Samuel", 24, &["2 samuel", "2 sam", "2sa", "second samuel"]),
    ("1Kgs", "1 Kings", 22, &["1 kings", "1 kgs", "1ki", "first kings"]),
    ("2Kgs", "2 Kings", 25, &["2 kings", "2 kgs", "2ki", "second kings"]),
    ("1Chr", "1 Chronicles", 29, &["1 chronicles", "1 chr", "1ch", "first chronicles"]),
    ("2Chr", "2 Chronicles", 36, &["2 chronicles", "2 chr", "2ch", "second chronicles"]),
    ("Ezra", "Ezra", 10, &["ezra", "ezr"]),
    ("Neh", "Nehemiah", 13, &["neh", "nehemiah"]),
    ("Esth", "Esther", 10, &["esth", "est", "esther"]),
    ("Job", "Job", 42, &["job"]),
    ("Ps", "Psalms", 150, &["ps", "psalm", "psalms", "psa"]),
    ("Prov", "Proverbs", 31, &["prov", "pr", "proverbs"]),
    ("Eccl", "Ecclesiastes", 12, &["eccl", "ecc", "ecclesiastes"]),
    ("Song", "Song of Solomon", 8, &["song", "song of solomon", "songs", "canticles"]),
    ("Isa", "Isaiah", 66, &["isa", "isaiah"]),
    ("Jer", "Jeremiah", 52, &["jer", "jeremiah"]),
    ("Lam", "Lamentations", 5, &["lam", "lamentations"]),
    ("Ezek", "Ezekiel", 48, &["ezek", "eze", "ezekiel"]),
    ("Dan", "Daniel", 12, &["dan", "daniel"]),
    ("Hos", "Hosea", 14, &["hos", "hosea"]),
    ("Joel", "Joel", 3, &["joel", "jl"]),
    ("Amos", "Amos", 9, &["amos", "am"]),
    ("Obad", "Obadiah", 1, &["obad", "ob", "obadiah"]),
    ("Jonah", "Jonah", 4, &["jonah", "jon"]),
    ("Mic", "Micah", 7, &["mic", "micah"]),
    ("Nah", "Nahum", 3, &["nah", "nahum"]),
    ("Hab", "Habakkuk", 3, &["hab", "habakkuk"]),
    ("Zeph", "Zephaniah", 3, &["zeph", "zep", "zephaniah"]),
    ("Hag", "Haggai", 2, &["hag", "haggai"]),
    ("Zech", "Zechariah", 14, &["zech", "zec", "zechariah"]),
    ("Mal", "Malachi", 4, &["mal", "malachi"]),
    ("Matt", "Matthew", 28, &["matt", "mt", "matthew"]),
    ("Mark", "Mark", 16, &["mark", "mk", "mrk"]),
    ("Luke", "Luke", 24, &["luke", "lk", "luk"]),
    ("John", "John", 21, &["john", "jn", "jhn"]),
    ("Acts", "Acts", 28, &["acts", "act"]),
    ("Rom", "Romans", 16, &["rom", "ro", "romans"]),
    ("1Cor", "1 Corinthians", 16, &["1 corinthians", "1 cor", "1co", "first corinthians"]),
    ("2Cor", "2 Corinthians", 13, &["2 corinthians", "2 cor", "2co", "second corinthians"]),
    ("Gal", "Galatians", 6, &["gal", "ga", "galatians"]),
    ("Eph", "Ephesians", 6, &["eph", "ephesians"]),
    ("Phil", "Philippians", 4, &["phil", "php", "philippians"]),
    ("Col", "Colossians", 4, &["col", "colossians"]),
    ("1Thess", "1 Thessalonians", 5, &["1 thessalonians", "1 thess", "1th", "first thessalonians"]),
    ("2Thess", "2 Thessalonians", 3, &["2 thessalonians", "2 thess", "2th", "second thessalonians"]),
    ("1Tim", "1 Timothy", 6, &["1 timothy", "1 tim", "1ti", "first timothy"]),
    ("2Tim", "2 Timothy", 4, &["2 timothy", "2 tim", "2ti", "second timothy"]),
    ("Titus", "Titus", 3, &["titus", "tit"]),
    ("Phlm", "Philemon", 1, &["philemon", "phm", "phlm"]),
    ("Heb", "Hebrews", 13, &["heb", "hebrews"]),
    ("Jas", "James", 5, &["james", "jas", "jm"]),
    ("1Pet", "1 Peter", 5, &["1 peter", "1 pet", "1pe", "first peter"]),
    ("2Pet", "2 Peter", 3, &["2 peter", "2 pet", "2pe", "second peter"]),
    ("1John", "1 John", 5, &["1 john", "1 jn", "1jo", "first john"]),
    ("2John", "2 John", 1, &["2 john", "2 jn", "2jo", "second john"]),
    ("3John", "3 John", 1, &["3 john", "3 jn", "3jo", "third john"]),
    ("Jude", "Jude", 1, &["jude", "jud"]),
    ("Rev", "Revelation", 22, &["rev", "re", "revelation", "apocalypse"]),
];

static REGISTRY: Lazy<BookRegistry> = Lazy::new(BookRegistry::build);

/// A book of the canon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    /// Canonical position, also the primary key in the store
    pub id: BookId,

    /// OSIS short code (e.g. "1Cor")
    pub osis: &'static str,

    /// Display name used in normalized labels (e.g. "1 Corinthians")
    pub name: &'static str,

    /// Number of chapters in the book
    pub chapters: u32,

    /// Lowercase lookup keys: name, OSIS code and abbreviations
    pub aliases: Vec<String>,
}

/// Immutable alias table over the canon
#[derive(Debug)]
pub struct BookRegistry {
    books: Vec<Book>,
    by_alias: HashMap<String, BookId>,
}

impl BookRegistry {
    /// The process-wide registry, built on first use
    #[must_use]
    pub fn canon() -> &'static BookRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let mut books = Vec::with_capacity(CANON.len());
        let mut by_alias = HashMap::new();

        for (idx, (osis, name, chapters, abbreviations)) in CANON.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)] // canon has 66 entries
            let id = BookId(idx as u8 + 1);

            let mut aliases: Vec<String> = Vec::with_capacity(abbreviations.len() + 2);
            for alias in std::iter::once(*name)
                .chain(std::iter::once(*osis))
                .chain(abbreviations.iter().copied())
            {
                let key = alias.to_lowercase();
                if !aliases.contains(&key) {
                    aliases.push(key);
                }
            }
            for key in &aliases {
                by_alias.insert(key.clone(), id);
            }

            books.push(Book {
                id,
                osis,
                name,
                chapters: *chapters,
                aliases,
            });
        }

        Self { books, by_alias }
    }

    /// Resolve a free-form book phrase ("1 Cor.", "II Kings", "psalm") to a book id
    #[must_use]
    pub fn lookup(&self, alias: &str) -> Option<BookId> {
        let key = normalize_book_phrase(alias);
        if key.is_empty() {
            return None;
        }
        if let Some(id) = self.by_alias.get(&key) {
            return Some(*id);
        }
        // "1 co" -> "1co"
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(d), Some(' ')) if d.is_ascii_digit() => {
                let joined = format!("{d}{}", chars.as_str());
                self.by_alias.get(&joined).copied()
            }
            _ => None,
        }
    }

    /// Resolve a book phrase straight to its catalog entry
    #[must_use]
    pub fn find(&self, alias: &str) -> Option<&Book> {
        self.lookup(alias).and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn get(&self, id: BookId) -> Option<&Book> {
        let idx = usize::from(id.0).checked_sub(1)?;
        self.books.get(idx)
    }

    /// All books in canonical order
    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Lowercase, turn periods into spaces, collapse whitespace and map a leading
/// Roman numeral ("i ", "ii ", "iii ") to its digit.
fn normalize_book_phrase(s: &str) -> String {
    let lowered = s.to_lowercase().replace('.', " ");
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    for (roman, digit) in [("iii ", "3 "), ("ii ", "2 "), ("i ", "1 ")] {
        if let Some(rest) = collapsed.strip_prefix(roman) {
            return format!("{digit}{rest}");
        }
    }
    collapsed
}
