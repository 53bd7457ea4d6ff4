use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::catalog::builder::{BuildSummary, IndexBuilder, SourceManifest};
use crate::catalog::schema::PARSER_VERSION;
use crate::cli::OutputFormat;
use crate::config::Settings;

#[derive(Args)]
pub struct IndexArgs {
    /// Source manifest (JSON) listing the corpora to index
    #[arg(short, long, required = true)]
    pub manifest: PathBuf,

    /// Directory that manifest paths are relative to [default: <DATA_DIR>/raw]
    #[arg(long)]
    pub raw_root: Option<PathBuf>,

    /// Re-derive every source even if its content is unchanged
    #[arg(long)]
    pub refresh: bool,
}

#[allow(clippy::needless_pass_by_value)]
pub fn run(
    args: IndexArgs,
    settings: &Settings,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let manifest = SourceManifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let raw_root = args.raw_root.unwrap_or_else(|| settings.raw_root());

    if verbose {
        eprintln!(
            "Indexing {} source(s) from {} into {}",
            manifest.sources.len(),
            raw_root.display(),
            settings.index_path.display()
        );
    }

    let mut store = super::open_index(settings)?;
    let summary = IndexBuilder::new(&mut store, raw_root)
        .refresh(args.refresh)
        .build(&manifest)
        .context("Failed to build index")?;

    match format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => print_json(&summary, settings)?,
        OutputFormat::Tsv => print_tsv(&summary),
    }

    Ok(())
}

fn print_json(summary: &BuildSummary, settings: &Settings) -> anyhow::Result<()> {
    let failures: Vec<_> = summary
        .failures
        .iter()
        .map(|(path, error)| serde_json::json!({ "path": path, "error": error }))
        .collect();

    let output = serde_json::json!({
        "index_path": settings.index_path.display().to_string(),
        "manifest_version": summary.manifest_version,
        "parser_version": PARSER_VERSION,
        "total_sources": summary.total_sources,
        "indexed": summary.indexed,
        "unchanged": summary.unchanged,
        "skipped": summary.skipped,
        "failed": summary.failed(),
        "entries_written": summary.entries_written,
        "failures": failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(summary: &BuildSummary) {
    println!("manifest_version\ttotal\tindexed\tunchanged\tskipped\tfailed\tentries_written");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        summary.manifest_version,
        summary.total_sources,
        summary.indexed,
        summary.unchanged,
        summary.skipped,
        summary.failed(),
        summary.entries_written
    );
}
