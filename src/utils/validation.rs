//! Centralized validation and helper functions.

use std::io::Read;
use std::path::Path;

/// Maximum length of a reference string accepted by the parser (DOS protection)
pub const MAX_REFERENCE_LENGTH: usize = 256;

/// Maximum number of entries a single source may contribute
pub const MAX_ENTRIES_PER_SOURCE: usize = 1_000_000;

/// Excerpts longer than this many characters are cut at a word boundary
pub const MAX_EXCERPT_CHARS: usize = 900;

/// Collapse all whitespace runs to single spaces and cap the excerpt at
/// [`MAX_EXCERPT_CHARS`] characters. A capped excerpt is cut at the last word
/// boundary and ends with an ellipsis.
///
/// # Examples
///
/// ```
/// use bible_commentary::utils::validation::normalize_excerpt;
///
/// assert_eq!(normalize_excerpt("  In the\n\tbeginning  "), "In the beginning");
/// ```
#[must_use]
pub fn normalize_excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_EXCERPT_CHARS {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(MAX_EXCERPT_CHARS - 1).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    format!("{cut}\u{2026}")
}

/// Map long-form commentator identifiers onto the short keys used for
/// preference ordering ("`matthew_henry`" -> "henry").
#[must_use]
pub fn normalize_commentator_key(value: &str) -> String {
    let key = value.trim().to_lowercase();
    match key.as_str() {
        "matthew_henry" => "henry".to_string(),
        "john_calvin" => "calvin".to_string(),
        "john_gill" => "gill".to_string(),
        "jamieson_fausset_brown" => "jfb".to_string(),
        "adam_clarke" => "clarke".to_string(),
        "charles_spurgeon" => "spurgeon".to_string(),
        _ => key,
    }
}

/// Compute the content hash of a source file for change detection.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_content_hash(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Check if adding another entry would exceed the per-source maximum.
///
/// Call this with the current count BEFORE adding a new entry.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_entry_limit(count: usize) -> Option<String> {
    if count >= MAX_ENTRIES_PER_SOURCE {
        Some(format!(
            "Too many entries: adding another would exceed maximum of {MAX_ENTRIES_PER_SOURCE}"
        ))
    } else {
        None
    }
}

/// Parse a comma-separated preference list ("henry, Calvin,,gill") into
/// normalized commentator keys, dropping blanks.
#[must_use]
pub fn parse_preference_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_commentator_key)
        .filter(|s| !s.is_empty())
        .collect()
}
