use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::catalog::index::CandidateFinder;
use crate::catalog::store::{CommentaryStore, StoreError};
use crate::core::entry::{Granularity, StoredEntry};
use crate::core::passage::Passage;
use crate::core::types::EntryId;
use crate::matching::scoring::ExcerptScore;
use crate::utils::validation::normalize_commentator_key;

/// Characters of an excerpt that take part in duplicate detection
pub const DEDUP_PREFIX_CHARS: usize = 120;

/// A ranked commentary excerpt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredExcerpt {
    pub entry_id: EntryId,
    pub commentator: String,
    pub work: String,
    pub coverage_label: String,
    pub granularity: Granularity,
    pub excerpt: String,
    pub score: f64,
    pub source_url: String,
    pub local_raw_path: String,
    #[serde(skip)]
    pub sort_chapter: u32,
    #[serde(skip)]
    pub sort_verse: u32,
}

impl ScoredExcerpt {
    fn new(entry: StoredEntry, score: f64) -> Self {
        Self {
            entry_id: entry.id,
            commentator: entry.commentator_key,
            work: entry.work_title,
            coverage_label: entry.passage_label,
            granularity: entry.granularity,
            excerpt: entry.excerpt,
            score,
            source_url: entry.source_url,
            local_raw_path: entry.local_raw_path,
            sort_chapter: entry.sort_chapter,
            sort_verse: entry.sort_verse,
        }
    }

    fn dedup_key(&self) -> (String, String, String) {
        (
            self.commentator.clone(),
            self.coverage_label.clone(),
            self.excerpt.chars().take(DEDUP_PREFIX_CHARS).collect(),
        )
    }
}

/// Caller-supplied commentator ordering, 0 = most preferred
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentatorPriority {
    ranks: HashMap<String, u32>,
}

impl CommentatorPriority {
    /// Rank given to commentators absent from the ordering
    pub const UNRANKED: u32 = 999;

    /// Rank commentators by position; keys are normalized like indexed
    /// commentator keys and the first occurrence of a repeated key wins.
    pub fn from_order<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranks = HashMap::new();
        let mut next: u32 = 0;
        for key in order {
            let key = normalize_commentator_key(key.as_ref());
            if key.is_empty() || ranks.contains_key(&key) {
                continue;
            }
            ranks.insert(key, next);
            next = next.saturating_add(1);
        }
        Self { ranks }
    }

    #[must_use]
    pub fn rank(&self, commentator_key: &str) -> u32 {
        self.ranks
            .get(&normalize_commentator_key(commentator_key))
            .copied()
            .unwrap_or(Self::UNRANKED)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Configuration for the search engine
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Scoring constants
    pub scoring_weights: ScoringWeights,
}

/// Constants of the candidate scoring function
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoringWeights {
    /// Granularity weight of a single-verse entry
    pub verse: f64,
    /// Granularity weight of a verse-range entry
    pub range: f64,
    /// Granularity weight of a whole-chapter entry
    pub chapter: f64,
    /// Granularity weight of anything else
    pub unknown: f64,

    /// Overlap term for any chapter entry
    pub chapter_entry_overlap: f64,
    /// Overlap term of a range entry against a chapter-only query
    pub chapter_query_range_overlap: f64,
    /// Overlap term of a verse entry against a chapter-only query
    pub chapter_query_overlap: f64,
    /// Overlap term when chapter spans differ
    pub misaligned_overlap: f64,
    /// Factor on overlap / query length
    pub query_coverage: f64,
    /// Factor on overlap / entry length
    pub entry_tightness: f64,
    /// Added when the entry span equals the query span
    pub exact_span: f64,

    pub preference_max: f64,
    pub preference_step: f64,
    pub preference_rank_cap: u32,

    pub full_length_min: f64,
    pub full_length_max: f64,
    pub full_length_bonus: f64,
    pub short_length_min: f64,
    pub short_length_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            verse: 1.0,
            range: 0.8,
            chapter: 0.45,
            unknown: 0.5,
            chapter_entry_overlap: 0.2,
            chapter_query_range_overlap: 0.35,
            chapter_query_overlap: 0.25,
            misaligned_overlap: 0.3,
            query_coverage: 0.6,
            entry_tightness: 0.2,
            exact_span: 0.2,
            preference_max: 0.25,
            preference_step: 0.03,
            preference_rank_cap: 20,
            full_length_min: 120.0,
            full_length_max: 1200.0,
            full_length_bonus: 0.05,
            short_length_min: 40.0,
            short_length_bonus: 0.02,
        }
    }
}

/// Ranks stored commentary against query passages
pub struct SearchEngine<'a> {
    finder: CandidateFinder<'a>,
    config: SearchConfig,
}

impl<'a> SearchEngine<'a> {
    /// Create a new search engine with default configuration
    pub fn new(store: &'a CommentaryStore) -> Self {
        Self::with_config(store, SearchConfig::default())
    }

    /// Create a new search engine with custom configuration
    pub fn with_config(store: &'a CommentaryStore, config: SearchConfig) -> Self {
        Self {
            finder: CandidateFinder::new(store),
            config,
        }
    }

    /// Score every candidate sharing a chapter with `passage`, drop duplicates
    /// and return the best `limit`.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if candidates cannot be read.
    pub fn search(
        &self,
        passage: &Passage,
        priority: &CommentatorPriority,
        limit: usize,
    ) -> Result<Vec<ScoredExcerpt>, StoreError> {
        let candidates = self.finder.find_candidates(passage)?;
        let candidate_count = candidates.len();

        let scored: Vec<ScoredExcerpt> = candidates
            .into_iter()
            .filter_map(|entry| {
                let rank = priority.rank(&entry.commentator_key);
                ExcerptScore::calculate(passage, &entry, rank, &self.config.scoring_weights)
                    .map(|score| ScoredExcerpt::new(entry, score.total))
            })
            .collect();

        debug!(
            passage = %passage,
            candidates = candidate_count,
            scored = scored.len(),
            "scored candidates"
        );
        Ok(rank_excerpts(scored, limit))
    }

    /// Search a passage that may span chapters.
    ///
    /// The passage is split per chapter, each part searched on its own, and
    /// the parts merged with the same deduplication and ordering as
    /// [`SearchEngine::search`]. This is the entry point for user queries.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if candidates cannot be read.
    pub fn search_passage(
        &self,
        passage: &Passage,
        priority: &CommentatorPriority,
        limit: usize,
    ) -> Result<Vec<ScoredExcerpt>, StoreError> {
        let parts = passage.split_by_chapter();
        if parts.len() == 1 {
            return self.search(passage, priority, limit);
        }

        let mut merged = Vec::new();
        for part in &parts {
            merged.extend(self.search(part, priority, limit)?);
        }
        Ok(rank_excerpts(merged, limit))
    }
}

/// Sort best-first, keep the best of each duplicate group and truncate
fn rank_excerpts(mut excerpts: Vec<ScoredExcerpt>, limit: usize) -> Vec<ScoredExcerpt> {
    excerpts.sort_by(compare_excerpts);

    let mut seen = std::collections::HashSet::new();
    excerpts.retain(|e| seen.insert(e.dedup_key()));
    excerpts.truncate(limit);
    excerpts
}

fn compare_excerpts(a: &ScoredExcerpt, b: &ScoredExcerpt) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.sort_chapter.cmp(&b.sort_chapter))
        .then(a.sort_verse.cmp(&b.sort_verse))
        .then(a.entry_id.cmp(&b.entry_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{NewEntry, NewSource};
    use crate::core::types::BookId;

    const ROMANS: BookId = BookId(45);

    fn store_with(entries: &[(&str, Passage, &str)]) -> CommentaryStore {
        let mut store = CommentaryStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let id = store
            .upsert_source(&NewSource {
                commentator_key: "mixed".to_string(),
                work_title: "Collected".to_string(),
                source_url: "https://example.com".to_string(),
                local_raw_path: "collected.jsonl".to_string(),
                parser_name: "test".to_string(),
                parser_version: "1".to_string(),
                content_hash: None,
            })
            .unwrap();
        let rows: Vec<NewEntry> = entries
            .iter()
            .map(|(who, p, text)| NewEntry::from_passage(*who, "Collected", p, text))
            .collect();
        store.replace_entries_for_source(id, &rows).unwrap();
        store
    }

    #[test]
    fn test_verse_entry_beats_chapter_entry() {
        let store = store_with(&[
            ("henry", Passage::chapter(ROMANS, 8).unwrap(), "Chapter overview"),
            ("henry", Passage::verse(ROMANS, 8, 28).unwrap(), "All things work together"),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::verse(ROMANS, 8, 28).unwrap();
        let results = engine
            .search(&query, &CommentatorPriority::default(), 8)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].granularity, Granularity::Verse);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_preference_breaks_otherwise_equal_scores() {
        let store = store_with(&[
            ("gill", Passage::verse(ROMANS, 8, 28).unwrap(), "Gill on the verse"),
            ("calvin", Passage::verse(ROMANS, 8, 28).unwrap(), "Calvin on the verse"),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::verse(ROMANS, 8, 28).unwrap();
        let priority = CommentatorPriority::from_order(["Calvin", "gill"]);
        let results = engine.search(&query, &priority, 8).unwrap();
        assert_eq!(results[0].commentator, "calvin");
        assert_eq!(results[1].commentator, "gill");
    }

    #[test]
    fn test_ties_break_on_position_then_id() {
        let store = store_with(&[
            ("gill", Passage::chapter(ROMANS, 9).unwrap(), "Second chapter"),
            ("gill", Passage::chapter(ROMANS, 8).unwrap(), "First chapter"),
            ("gill", Passage::chapter(ROMANS, 8).unwrap(), "First chapter again"),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::chapters(ROMANS, 8, 9).unwrap();
        let results = engine
            .search(&query, &CommentatorPriority::default(), 8)
            .unwrap();
        let excerpts: Vec<&str> = results.iter().map(|r| r.excerpt.as_str()).collect();
        assert_eq!(excerpts, vec!["First chapter", "First chapter again", "Second chapter"]);
    }

    #[test]
    fn test_dedup_keeps_one_of_identical_rows() {
        let text = "The same words repeated in two places of the corpus";
        let store = store_with(&[
            ("henry", Passage::verse(ROMANS, 8, 28).unwrap(), text),
            ("henry", Passage::verse(ROMANS, 8, 28).unwrap(), text),
            ("gill", Passage::verse(ROMANS, 8, 28).unwrap(), text),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::verse(ROMANS, 8, 28).unwrap();
        let results = engine
            .search(&query, &CommentatorPriority::default(), 8)
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_limit_truncates() {
        let store = store_with(&[
            ("a", Passage::verse(ROMANS, 8, 28).unwrap(), "one"),
            ("b", Passage::verse(ROMANS, 8, 28).unwrap(), "two"),
            ("c", Passage::verse(ROMANS, 8, 28).unwrap(), "three"),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::verse(ROMANS, 8, 28).unwrap();
        let results = engine
            .search(&query, &CommentatorPriority::default(), 2)
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_passage_merges_chapters() {
        let store = store_with(&[
            ("henry", Passage::verse(ROMANS, 8, 38).unwrap(), "Neither death nor life"),
            ("henry", Passage::verse(ROMANS, 9, 3).unwrap(), "Accursed for my brethren"),
            ("henry", Passage::new(ROMANS, 8, Some(38), 9, Some(5)).unwrap(), "Across the chapters"),
            ("henry", Passage::verse(ROMANS, 9, 20).unwrap(), "Who art thou, O man"),
        ]);
        let engine = SearchEngine::new(&store);
        let query = Passage::new(ROMANS, 8, Some(38), 9, Some(5)).unwrap();
        let results = engine
            .search_passage(&query, &CommentatorPriority::default(), 8)
            .unwrap();

        let labels: Vec<&str> = results.iter().map(|r| r.coverage_label.as_str()).collect();
        assert!(labels.contains(&"Romans 8:38"));
        assert!(labels.contains(&"Romans 9:3"));
        assert!(!labels.contains(&"Romans 9:20"));
        // The cross-chapter entry is found from both halves but returned once
        assert_eq!(labels.iter().filter(|l| **l == "Romans 8:38-9:5").count(), 1);
    }

    #[test]
    fn test_compare_excerpts_total_order() {
        let make = |id: i64, score: f64, chapter: u32| ScoredExcerpt {
            entry_id: EntryId(id),
            commentator: "henry".to_string(),
            work: "Commentary".to_string(),
            coverage_label: format!("Romans {chapter}"),
            granularity: Granularity::Chapter,
            excerpt: format!("excerpt {id}"),
            score,
            source_url: String::new(),
            local_raw_path: String::new(),
            sort_chapter: chapter,
            sort_verse: 0,
        };
        let ranked = rank_excerpts(
            vec![make(1, 0.5, 9), make(2, f64::NAN, 8), make(3, 1.5, 9), make(4, 0.5, 8)],
            8,
        );
        let ids: Vec<i64> = ranked.iter().map(|r| r.entry_id.0).collect();
        // NaN sorts as the largest value, equal scores fall back to position
        assert_eq!(ids, vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_priority_ranks() {
        let priority = CommentatorPriority::from_order(["Henry", " calvin ", "henry", ""]);
        assert_eq!(priority.len(), 2);
        assert_eq!(priority.rank("HENRY"), 0);
        assert_eq!(priority.rank("calvin"), 1);
        assert_eq!(priority.rank("gill"), CommentatorPriority::UNRANKED);

        let long_form = CommentatorPriority::from_order(["matthew_henry", "John_Calvin"]);
        assert_eq!(long_form.rank("henry"), 0);
        assert_eq!(long_form.rank("calvin"), 1);
        assert_eq!(long_form.rank("matthew_henry"), 0);
    }
}
