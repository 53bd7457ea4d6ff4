//! Index builder that turns a source manifest into stored entries.
//!
//! Each manifest source names a local file and how to read it. Sources are
//! processed independently: a source that is missing or fails to parse is
//! logged and counted, its previously indexed entries stay in place, and the
//! build moves on to the next source.

use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::schema::{
    MANIFEST_PARSER_VERSION, MANIFEST_SOURCE_MANIFEST_VERSION, PARSER_VERSION,
};
use crate::catalog::store::{CommentaryStore, StoreError};
use crate::core::book::BookRegistry;
use crate::core::entry::{NewEntry, NewSource};
use crate::parsing::records::{read_records, read_text, RecordError};
use crate::parsing::segment::{
    chapter_from_filename, chapter_segment, infer_default_book, segment_text, SegmentScope,
};
use crate::utils::validation::{compute_content_hash, normalize_commentator_key};

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid source manifest: {0}")]
    Manifest(String),

    #[error("Required source file missing: {0}")]
    MissingSource(String),

    #[error("Record error: {0}")]
    Records(#[from] RecordError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// How a source file is turned into entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// Structured JSON Lines excerpt records
    Jsonl,
    /// Line-oriented reference scan of plain text
    #[default]
    #[serde(alias = "generic_refscan")]
    Refscan,
    /// One chapter-level excerpt per file, falling back to a reference scan
    #[serde(alias = "psalm_chapter_fallback")]
    ChapterFallback,
}

impl ParserKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Refscan => "refscan",
            Self::ChapterFallback => "chapter_fallback",
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_required() -> bool {
    true
}

/// One commentary source listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub commentator_key: String,
    pub work_title: String,
    #[serde(default)]
    pub source_url: String,
    /// Path of the raw file, relative to the raw root unless absolute
    pub local_path: String,
    #[serde(default)]
    pub parser: ParserKind,
    #[serde(default)]
    pub default_book: Option<String>,
    #[serde(default)]
    pub default_chapter: Option<u32>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_manifest_version() -> String {
    "1".to_string()
}

/// Accept the manifest version as a JSON string or number
fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "manifest_version must be a string or number, got {other}"
        ))),
    }
}

/// The list of sources an index is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    #[serde(default = "default_manifest_version", deserialize_with = "version_string")]
    pub manifest_version: String,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl SourceManifest {
    /// Parse a manifest from JSON text
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Manifest` if the JSON does not describe a manifest.
    pub fn from_json(json: &str) -> Result<Self, BuilderError> {
        serde_json::from_str(json).map_err(|e| BuilderError::Manifest(e.to_string()))
    }

    /// Load a manifest file
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Io` if the file cannot be read and
    /// `BuilderError::Manifest` if it is not a valid manifest.
    pub fn load(path: &Path) -> Result<Self, BuilderError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Required sources whose raw file is absent under `raw_root`
    #[must_use]
    pub fn missing_required<'m>(&'m self, raw_root: &Path) -> Vec<&'m SourceSpec> {
        self.sources
            .iter()
            .filter(|s| s.required && !raw_root.join(&s.local_path).is_file())
            .collect()
    }
}

/// What happened to one source during a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Entries were replaced
    Indexed { entries: usize },
    /// Content hash and parser version match the stored source
    Unchanged,
    /// Optional source whose file does not exist
    Skipped,
}

/// Summary of an index build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub total_sources: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub entries_written: usize,
    /// (local path, error) for every source that failed
    pub failures: Vec<(String, String)>,
    pub manifest_version: String,
}

impl BuildSummary {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Index Build Summary")?;
        writeln!(f, "===================")?;
        writeln!(f, "Manifest version: {}", self.manifest_version)?;
        writeln!(f, "Parser version:   {PARSER_VERSION}")?;
        writeln!(f)?;
        writeln!(f, "Sources: {} total", self.total_sources)?;
        writeln!(f, "  - Indexed:   {}", self.indexed)?;
        writeln!(f, "  - Unchanged: {}", self.unchanged)?;
        writeln!(f, "  - Skipped:   {}", self.skipped)?;
        writeln!(f, "  - Failed:    {}", self.failed())?;
        writeln!(f, "Entries written: {}", self.entries_written)?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for (path, error) in &self.failures {
                writeln!(f, "  - {path}: {error}")?;
            }
        }
        Ok(())
    }
}

/// Builds or refreshes a commentary index from a source manifest
pub struct IndexBuilder<'a> {
    store: &'a mut CommentaryStore,
    raw_root: PathBuf,
    refresh: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(store: &'a mut CommentaryStore, raw_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            raw_root: raw_root.into(),
            refresh: false,
        }
    }

    /// Re-derive every source even when its content hash is unchanged
    #[must_use]
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Index every source of the manifest, then record the parser and
    /// manifest versions.
    ///
    /// # Errors
    ///
    /// Per-source failures are collected in the summary; only a failure to
    /// write the build manifest is returned as an error.
    pub fn build(&mut self, manifest: &SourceManifest) -> Result<BuildSummary, BuilderError> {
        let mut summary = BuildSummary {
            total_sources: manifest.sources.len(),
            manifest_version: manifest.manifest_version.clone(),
            ..BuildSummary::default()
        };
        info!(
            sources = manifest.sources.len(),
            raw_root = %self.raw_root.display(),
            "starting index build"
        );

        for (idx, spec) in manifest.sources.iter().enumerate() {
            match self.index_source(spec) {
                Ok(SourceOutcome::Indexed { entries }) => {
                    info!(
                        current = idx + 1,
                        total = manifest.sources.len(),
                        entries,
                        source = %spec.local_path,
                        "indexed source"
                    );
                    summary.indexed += 1;
                    summary.entries_written += entries;
                }
                Ok(SourceOutcome::Unchanged) => {
                    debug!(source = %spec.local_path, "source unchanged");
                    summary.unchanged += 1;
                }
                Ok(SourceOutcome::Skipped) => {
                    warn!(source = %spec.local_path, "raw source file missing; skipping");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        source = %spec.local_path,
                        "source failed; retaining prior entries if present: {e}"
                    );
                    summary.failures.push((spec.local_path.clone(), e.to_string()));
                }
            }
        }

        self.store.set_manifest(MANIFEST_PARSER_VERSION, PARSER_VERSION)?;
        self.store
            .set_manifest(MANIFEST_SOURCE_MANIFEST_VERSION, &manifest.manifest_version)?;

        info!(
            indexed = summary.indexed,
            unchanged = summary.unchanged,
            failed = summary.failed(),
            entries = summary.entries_written,
            "index build complete"
        );
        Ok(summary)
    }

    /// Index one source
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingSource` for a missing required file, or
    /// the read, parse or store error that stopped the source.
    pub fn index_source(&mut self, spec: &SourceSpec) -> Result<SourceOutcome, BuilderError> {
        let path = self.raw_root.join(&spec.local_path);
        if !path.is_file() {
            if spec.required {
                return Err(BuilderError::MissingSource(path.display().to_string()));
            }
            return Ok(SourceOutcome::Skipped);
        }

        let content_hash = compute_content_hash(&path)?;
        let commentator_key = normalize_commentator_key(&spec.commentator_key);
        let local_raw_path = path.to_string_lossy().into_owned();

        let previous =
            self.store
                .find_source(&commentator_key, &spec.work_title, &local_raw_path)?;
        if !self.refresh {
            if let Some(state) = &previous {
                if state.parser_version == PARSER_VERSION
                    && state.content_hash.as_deref() == Some(content_hash.as_str())
                {
                    return Ok(SourceOutcome::Unchanged);
                }
            }
        }

        let entries = derive_entries(spec, &commentator_key, &path)?;

        let mut source = NewSource {
            commentator_key,
            work_title: spec.work_title.clone(),
            source_url: spec.source_url.clone(),
            local_raw_path,
            parser_name: spec.parser.to_string(),
            parser_version: PARSER_VERSION.to_string(),
            content_hash: previous.and_then(|s| s.content_hash),
        };
        let source_id = self.store.upsert_source(&source)?;
        let written = self.store.replace_entries_for_source(source_id, &entries)?;

        // The new hash is recorded only once the new entries are in place
        source.content_hash = Some(content_hash);
        self.store.upsert_source(&source)?;

        Ok(SourceOutcome::Indexed { entries: written })
    }
}

/// Derive the entries of one source file according to its parser
fn derive_entries(
    spec: &SourceSpec,
    commentator_key: &str,
    path: &Path,
) -> Result<Vec<NewEntry>, BuilderError> {
    if spec.parser == ParserKind::Jsonl {
        let records = read_records(path)?;
        let entries = records
            .iter()
            .flat_map(|record| {
                let commentator = record
                    .commentator
                    .as_deref()
                    .map_or_else(|| commentator_key.to_string(), normalize_commentator_key);
                let work = record.work.as_deref().unwrap_or(&spec.work_title);
                record.to_entries(&commentator, work, spec.default_book.as_deref())
            })
            .collect();
        return Ok(entries);
    }

    let text = read_text(path)?;
    let book = spec
        .default_book
        .as_deref()
        .and_then(|b| BookRegistry::canon().lookup(b))
        .or_else(|| infer_default_book(&spec.work_title, commentator_key, &text));

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let chapter = match spec.parser {
        ParserKind::ChapterFallback => spec.default_chapter.or_else(|| chapter_from_filename(&file_name)),
        _ => spec.default_chapter,
    };
    let scope = SegmentScope { book, chapter };

    let segments = match spec.parser {
        ParserKind::ChapterFallback => match chapter_segment(&text, &scope) {
            Some(segment) => vec![segment],
            None => segment_text(&text, &scope),
        },
        _ => segment_text(&text, &scope),
    };

    Ok(segments
        .iter()
        .flat_map(|segment| {
            segment.passages.iter().map(|passage| {
                NewEntry::from_passage(commentator_key, &spec.work_title, passage, &segment.excerpt)
            })
        })
        .collect())
}

/// Whether the index was built by a different parser version or from a
/// different manifest version than `manifest_version`.
///
/// # Errors
///
/// Returns a `StoreError` if the build manifest cannot be read.
pub fn needs_rebuild(store: &CommentaryStore, manifest_version: &str) -> Result<bool, StoreError> {
    let parser = store.get_manifest(MANIFEST_PARSER_VERSION)?;
    let manifest = store.get_manifest(MANIFEST_SOURCE_MANIFEST_VERSION)?;
    Ok(parser.as_deref() != Some(PARSER_VERSION) || manifest.as_deref() != Some(manifest_version))
}
