use crate::core::entry::{Granularity, StoredEntry};
use crate::core::passage::Passage;
use crate::matching::engine::ScoringWeights;

/// Convert a character count to f64 for the length bonus
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Score of one candidate entry against a query passage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcerptScore {
    /// Presumed topicality of the entry's granularity
    pub granularity_weight: f64,

    /// How well the entry's span matches the query span
    pub overlap: f64,

    /// Bonus for preferred commentators
    pub preference_bonus: f64,

    /// Bonus for excerpts of a useful length
    pub length_bonus: f64,

    /// Sum of the four terms
    pub total: f64,
}

impl ExcerptScore {
    /// Score a candidate, or `None` if it must be excluded.
    ///
    /// A candidate is excluded when its overlap term is zero, except that a
    /// chapter entry is always kept for a chapter-only query.
    #[must_use]
    pub fn calculate(
        query: &Passage,
        entry: &StoredEntry,
        priority_rank: u32,
        weights: &ScoringWeights,
    ) -> Option<Self> {
        let overlap = overlap_score(query, entry, weights);
        let chapter_for_chapter =
            query.is_chapter_only() && entry.granularity == Granularity::Chapter;
        if overlap <= 0.0 && !chapter_for_chapter {
            return None;
        }

        let granularity_weight = granularity_weight(entry.granularity, weights);
        let preference_bonus = preference_bonus(priority_rank, weights);
        let length_bonus = length_bonus(&entry.excerpt, weights);

        Some(Self {
            granularity_weight,
            overlap,
            preference_bonus,
            length_bonus,
            total: granularity_weight + overlap + preference_bonus + length_bonus,
        })
    }
}

/// Weight of an entry's granularity
#[must_use]
pub fn granularity_weight(granularity: Granularity, weights: &ScoringWeights) -> f64 {
    match granularity {
        Granularity::Verse => weights.verse,
        Granularity::Range => weights.range,
        Granularity::Chapter => weights.chapter,
        Granularity::Unknown => weights.unknown,
    }
}

/// Overlap term between the query and a candidate already known to share at
/// least one chapter with it.
#[must_use]
pub fn overlap_score(query: &Passage, entry: &StoredEntry, weights: &ScoringWeights) -> f64 {
    if entry.granularity == Granularity::Chapter {
        return weights.chapter_entry_overlap;
    }

    let (Some(q1), Some(q2)) = (query.verse_start(), query.verse_end()) else {
        return if entry.granularity == Granularity::Range {
            weights.chapter_query_range_overlap
        } else {
            weights.chapter_query_overlap
        };
    };

    if entry.chapter_start != query.chapter_start() || entry.chapter_end != query.chapter_end() {
        return weights.misaligned_overlap;
    }

    let r1 = entry.verse_start.unwrap_or(1);
    let r2 = entry.verse_end.unwrap_or(r1);
    let overlap = (r2.min(q2) + 1).saturating_sub(r1.max(q1));
    if overlap == 0 {
        return 0.0;
    }

    let query_len = (q2 + 1).saturating_sub(q1).max(1);
    let entry_len = (r2 + 1).saturating_sub(r1).max(1);
    let exact = if r1 == q1 && r2 == q2 { 1.0 } else { 0.0 };

    let overlap = f64::from(overlap);
    weights.query_coverage * (overlap / f64::from(query_len))
        + weights.entry_tightness * (overlap / f64::from(entry_len))
        + weights.exact_span * exact
}

/// Bonus decaying with commentator rank (0 = most preferred)
#[must_use]
pub fn preference_bonus(rank: u32, weights: &ScoringWeights) -> f64 {
    let rank = f64::from(rank.min(weights.preference_rank_cap));
    (weights.preference_max - rank * weights.preference_step).max(0.0)
}

/// Bonus for excerpts long enough to be substantive
#[must_use]
pub fn length_bonus(excerpt: &str, weights: &ScoringWeights) -> f64 {
    let len = count_to_f64(excerpt.trim().chars().count());
    if (weights.full_length_min..=weights.full_length_max).contains(&len) {
        weights.full_length_bonus
    } else if len > weights.short_length_min {
        weights.short_length_bonus
    } else {
        0.0
    }
}
