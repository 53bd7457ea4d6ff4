//! Input Limit and Hostile Input Tests
//!
//! Corpora and references come from outside the program. These tests check
//! that oversized or malformed input is rejected or skipped instead of
//! exhausting memory or aborting a whole build.

use std::io::Write;

use bible_commentary::catalog::builder::{IndexBuilder, SourceManifest};
use bible_commentary::parsing::records::read_records;
use bible_commentary::utils::validation::{
    check_entry_limit, normalize_excerpt, MAX_ENTRIES_PER_SOURCE, MAX_EXCERPT_CHARS,
    MAX_REFERENCE_LENGTH,
};
use bible_commentary::{parse, scan, CommentaryStore, ReferenceError};
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// Overlong reference strings are rejected before any regex work
#[test]
fn test_reference_length_limit() {
    let padded = format!("Romans 8:28{}", " ".repeat(MAX_REFERENCE_LENGTH));
    assert!(matches!(parse(&padded, false), Err(ReferenceError::Malformed(_))));

    let at_limit = format!("{:>width$}", "Romans 8:28", width = MAX_REFERENCE_LENGTH);
    assert!(parse(&at_limit, false).is_ok());
}

/// Scanning a large document finds every reference and never panics
#[test]
fn test_scan_large_input() {
    let line = "See Rom 8:28 and 1 Cor 13:4-7, also 999:999 and Nowhere 3:16.\n";
    let text = line.repeat(5_000);
    let found = scan(&text, None);
    assert_eq!(found.len(), 10_000);
}

/// Excerpts are capped no matter how long the source paragraph is
#[test]
fn test_excerpt_cap() {
    let text = "word ".repeat(10_000);
    let excerpt = normalize_excerpt(&text);
    assert!(excerpt.chars().count() <= MAX_EXCERPT_CHARS);
    assert!(excerpt.ends_with('\u{2026}'));
}

#[test]
fn test_entry_limit() {
    assert!(check_entry_limit(0).is_none());
    assert!(check_entry_limit(MAX_ENTRIES_PER_SOURCE - 1).is_none());
    assert!(check_entry_limit(MAX_ENTRIES_PER_SOURCE).is_some());
}

/// Malformed JSONL lines are skipped, valid ones kept, in plain and gzip files
#[test]
fn test_malformed_records_skipped() {
    let dir = TempDir::new().unwrap();
    let body = concat!(
        "{\"reference\": \"John 3:16\", \"text\": \"For God so loved\"}\n",
        "{truncated\n",
        "[1, 2, 3]\n",
        "\n",
        "{\"reference\": \"John 3:17\", \"text\": \"Not to condemn\"}\n",
    );

    let plain = dir.path().join("records.jsonl");
    std::fs::write(&plain, body).unwrap();
    assert_eq!(read_records(&plain).unwrap().len(), 2);

    let gz = dir.path().join("records.jsonl.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap();
    assert_eq!(read_records(&gz).unwrap().len(), 2);
}

/// A corrupt source fails alone; the others in the manifest still index
#[test]
fn test_corrupt_source_isolated() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(raw.join("broken.jsonl.gz"), b"this is not gzip data").unwrap();
    std::fs::write(raw.join("good.txt"), "John 3:16 For God so loved the world.\n").unwrap();

    let manifest = SourceManifest::from_json(
        r#"{"sources": [
            {"commentator_key": "henry", "work_title": "A", "local_path": "broken.jsonl.gz", "parser": "jsonl"},
            {"commentator_key": "gill", "work_title": "B", "local_path": "good.txt"}
        ]}"#,
    )
    .unwrap();

    let mut store = CommentaryStore::open_in_memory().unwrap();
    store.init_schema().unwrap();
    let summary = IndexBuilder::new(&mut store, &raw).build(&manifest).unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].0, "broken.jsonl.gz");
    assert_eq!(summary.indexed, 1);
    assert_eq!(store.entry_count().unwrap(), 1);
}

/// Manifests that are not JSON objects of the expected shape are rejected
#[test]
fn test_invalid_manifests() {
    let invalid = [
        "",
        "not json",
        r#"{"sources": "henry"}"#,
        r#"{"manifest_version": [1], "sources": []}"#,
        r#"{"sources": [{"work_title": "No commentator", "local_path": "x.txt"}]}"#,
        r#"{"sources": [{"commentator_key": "x", "work_title": "y", "local_path": "z", "parser": "pdf"}]}"#,
    ];
    for json in invalid {
        assert!(
            SourceManifest::from_json(json).is_err(),
            "manifest should be rejected: {json}"
        );
    }
}
