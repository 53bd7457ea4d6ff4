use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::catalog::store::{CommentaryStore, StoreError};
use crate::cli::OutputFormat;
use crate::config::{Settings, ENV_MAX_EXCERPTS, ENV_PREFERRED_COMMENTATORS};
use crate::core::passage::Passage;
use crate::matching::engine::{ScoredExcerpt, SearchEngine};
use crate::parsing::reference::parse;

/// Results named in the synthesis line
const SYNTHESIS_NAMES: usize = 5;
/// Excerpts quoted in the synthesis line
const SYNTHESIS_THEMES: usize = 3;
/// Characters quoted from each excerpt
const THEME_CHARS: usize = 180;

#[derive(Args)]
pub struct QueryArgs {
    /// Passage reference, e.g. "Romans 8:28-30" (quotes optional)
    #[arg(required = true, num_args = 1..)]
    pub passage: Vec<String>,

    /// Maximum number of excerpts to return
    #[arg(short = 'n', long, env = ENV_MAX_EXCERPTS)]
    pub max_excerpts: Option<usize>,

    /// Commentators in preference order, comma-separated
    #[arg(long, env = ENV_PREFERRED_COMMENTATORS)]
    pub prefer: Option<String>,

    /// Reject ambiguous references instead of guessing
    #[arg(long)]
    pub strict: bool,
}

/// Everything printed for a query
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query: String,
    pub normalized_passage: String,
    pub results: Vec<ScoredExcerpt>,
    pub synthesis: String,
    pub warnings: Vec<String>,
    pub provenance: Vec<Provenance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub commentator: String,
    pub source_url: String,
}

#[allow(clippy::needless_pass_by_value)]
pub fn run(
    args: QueryArgs,
    settings: &Settings,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        Some(settings.data_dir.clone()),
        Some(settings.index_path.clone()),
        args.prefer.as_deref(),
        args.max_excerpts,
    );
    let query = args.passage.join(" ");
    let passage = parse(&query, args.strict)
        .with_context(|| format!("Failed to parse passage {query:?}"))?;

    if verbose {
        eprintln!("Querying {} in {}", passage, settings.index_path.display());
    }

    let store = super::open_index(&settings)?;
    let engine = SearchEngine::new(&store);
    let results = engine
        .search_passage(&passage, &settings.priority(), settings.max_excerpts)
        .context("Failed to search the index")?;

    let report = build_report(&store, &settings, query, &passage, results)?;

    match format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Tsv => print_tsv(&report),
    }

    Ok(())
}

/// Assemble the report for a finished search
///
/// # Errors
///
/// Returns a `StoreError` if coverage cannot be read.
pub fn build_report(
    store: &CommentaryStore,
    settings: &Settings,
    query: String,
    passage: &Passage,
    results: Vec<ScoredExcerpt>,
) -> Result<QueryReport, StoreError> {
    let label = passage.normalized_label();
    let warnings = collect_warnings(store, settings, passage, &results)?;

    let mut provenance: Vec<Provenance> = Vec::new();
    for result in &results {
        let item = Provenance {
            commentator: result.commentator.clone(),
            source_url: result.source_url.clone(),
        };
        if !provenance.contains(&item) {
            provenance.push(item);
        }
    }

    Ok(QueryReport {
        query,
        synthesis: synthesize(&label, &results),
        normalized_passage: label,
        results,
        warnings,
        provenance,
    })
}

/// One-paragraph summary naming the commentators found and quoting the
/// openings of the best excerpts
#[must_use]
pub fn synthesize(label: &str, results: &[ScoredExcerpt]) -> String {
    if results.is_empty() {
        return format!("No indexed commentary excerpts were found for {label}.");
    }

    let mut names: Vec<&str> = Vec::new();
    for result in results.iter().take(SYNTHESIS_NAMES) {
        if !names.contains(&result.commentator.as_str()) {
            names.push(&result.commentator);
        }
    }

    let themes: Vec<String> = results
        .iter()
        .take(SYNTHESIS_THEMES)
        .map(|r| r.excerpt.chars().take(THEME_CHARS).collect::<String>())
        .map(|theme| theme.trim().to_string())
        .filter(|theme| !theme.is_empty())
        .collect();

    format!(
        "Retrieved {} local commentary excerpt(s) for {label} from {}. \
         Review the attributed excerpts for detail; summary themes: {}",
        results.len(),
        names.join(", "),
        themes.join(" | ")
    )
}

fn collect_warnings(
    store: &CommentaryStore,
    settings: &Settings,
    passage: &Passage,
    results: &[ScoredExcerpt],
) -> Result<Vec<String>, StoreError> {
    let mut warnings = Vec::new();

    if store.entry_count()? == 0 {
        warnings.push(
            "The index is empty; build it with `bible-commentary index --manifest FILE`."
                .to_string(),
        );
        return Ok(warnings);
    }

    if results.is_empty() {
        warnings.push(
            "No direct indexed commentary excerpts found; corpus/parser coverage may be incomplete."
                .to_string(),
        );
    }

    let mut uncovered = Vec::new();
    for commentator in &settings.preferred_commentators {
        if results.iter().any(|r| &r.commentator == commentator) {
            continue;
        }
        let mut covered = false;
        for chapter in passage.chapter_start()..=passage.chapter_end() {
            if store.has_coverage(commentator, passage.book_id(), chapter)? {
                covered = true;
                break;
            }
        }
        if !covered {
            uncovered.push(commentator.as_str());
        }
    }
    if !uncovered.is_empty() {
        warnings.push(format!(
            "No indexed coverage of {} from: {}.",
            passage.book_name(),
            uncovered.join(", ")
        ));
    }

    Ok(warnings)
}

fn print_text(report: &QueryReport) {
    println!("{}", report.normalized_passage);
    println!("{}", "─".repeat(60));
    println!();
    println!("Commentary Summary:");
    println!("  {}", report.synthesis);

    if !report.warnings.is_empty() {
        println!();
        println!("Notes:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }

    if report.results.is_empty() {
        return;
    }

    println!();
    println!("Excerpts:");
    for result in &report.results {
        println!();
        println!(
            "- [{}] {} ({}, {}, score={:.3})",
            result.commentator,
            result.work,
            result.coverage_label,
            result.granularity,
            result.score
        );
        println!("  {}", result.excerpt);
        if !result.source_url.is_empty() {
            println!("  Source: {}", result.source_url);
        }
    }
}

fn print_json(report: &QueryReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn print_tsv(report: &QueryReport) {
    println!("rank\tscore\tcommentator\twork\tcoverage\tgranularity\tsource_url\texcerpt");
    for (i, result) in report.results.iter().enumerate() {
        println!(
            "{}\t{:.4}\t{}\t{}\t{}\t{}\t{}\t{}",
            i + 1,
            result.score,
            result.commentator,
            result.work,
            result.coverage_label,
            result.granularity,
            result.source_url,
            result.excerpt
        );
    }
}
