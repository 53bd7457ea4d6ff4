use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::catalog::builder::{needs_rebuild, SourceManifest};
use crate::catalog::schema::{
    MANIFEST_PARSER_VERSION, MANIFEST_SCHEMA_VERSION, MANIFEST_SOURCE_MANIFEST_VERSION,
    PARSER_VERSION,
};
use crate::catalog::store::CoverageSpan;
use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::core::book::BookRegistry;
use crate::utils::validation::normalize_commentator_key;

#[derive(Args)]
pub struct StatusArgs {
    /// Compare the index against this source manifest
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Directory that manifest paths are relative to [default: <DATA_DIR>/raw]
    #[arg(long, requires = "manifest")]
    pub raw_root: Option<PathBuf>,

    /// List the chapter coverage of one commentator
    #[arg(long, value_name = "COMMENTATOR")]
    pub coverage: Option<String>,
}

struct Status {
    index_path: String,
    exists: bool,
    schema_version: Option<String>,
    parser_version: Option<String>,
    source_manifest_version: Option<String>,
    sources: usize,
    entries: usize,
    rebuild_needed: Option<bool>,
    missing_sources: Vec<String>,
    coverage: Option<(String, Vec<CoverageSpan>)>,
}

#[allow(clippy::needless_pass_by_value)]
pub fn run(
    args: StatusArgs,
    settings: &Settings,
    format: OutputFormat,
    _verbose: bool,
) -> anyhow::Result<()> {
    let mut status = Status {
        index_path: settings.index_path.display().to_string(),
        exists: settings.index_path.exists(),
        schema_version: None,
        parser_version: None,
        source_manifest_version: None,
        sources: 0,
        entries: 0,
        rebuild_needed: None,
        missing_sources: Vec::new(),
        coverage: None,
    };

    let manifest = args
        .manifest
        .as_ref()
        .map(|path| {
            SourceManifest::load(path)
                .with_context(|| format!("Failed to load manifest {}", path.display()))
        })
        .transpose()?;

    if let Some(manifest) = &manifest {
        let raw_root = args.raw_root.clone().unwrap_or_else(|| settings.raw_root());
        status.missing_sources = manifest
            .missing_required(&raw_root)
            .into_iter()
            .map(|spec| spec.local_path.clone())
            .collect();
    }

    // Do not create an index just to report that there is none
    if status.exists {
        let store = super::open_index(settings)?;
        status.schema_version = store.get_manifest(MANIFEST_SCHEMA_VERSION)?;
        status.parser_version = store.get_manifest(MANIFEST_PARSER_VERSION)?;
        status.source_manifest_version = store.get_manifest(MANIFEST_SOURCE_MANIFEST_VERSION)?;
        status.sources = store.source_count()?;
        status.entries = store.entry_count()?;
        if let Some(manifest) = &manifest {
            status.rebuild_needed = Some(needs_rebuild(&store, &manifest.manifest_version)?);
        }
        if let Some(commentator) = &args.coverage {
            let key = normalize_commentator_key(commentator);
            status.coverage = Some((key.clone(), store.coverage_for(&key)?));
        }
    } else if manifest.is_some() {
        status.rebuild_needed = Some(true);
    }

    match format {
        OutputFormat::Text => print_text(&status),
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Tsv => print_tsv(&status),
    }

    Ok(())
}

fn or_none(value: Option<&String>) -> &str {
    value.map_or("(none)", String::as_str)
}

fn span_label(span: &CoverageSpan) -> String {
    let book = BookRegistry::canon()
        .get(span.book_id)
        .map_or("?", |b| b.name);
    if span.chapter_start == span.chapter_end {
        format!("{book} {}", span.chapter_start)
    } else {
        format!("{book} {}-{}", span.chapter_start, span.chapter_end)
    }
}

fn print_text(status: &Status) {
    println!("Index: {}", status.index_path);
    println!("{}", "─".repeat(60));

    if !status.exists {
        println!("Not built yet. Run `bible-commentary index --manifest FILE`.");
    } else {
        println!("Schema version:          {}", or_none(status.schema_version.as_ref()));
        println!(
            "Parser version:          {} (current {PARSER_VERSION})",
            or_none(status.parser_version.as_ref())
        );
        println!(
            "Source manifest version: {}",
            or_none(status.source_manifest_version.as_ref())
        );
        println!("Sources:                 {}", status.sources);
        println!("Entries:                 {}", status.entries);
    }

    if let Some(rebuild) = status.rebuild_needed {
        println!();
        println!("Rebuild needed: {}", if rebuild { "yes" } else { "no" });
    }

    if !status.missing_sources.is_empty() {
        println!();
        println!("Missing required sources:");
        for path in &status.missing_sources {
            println!("  - {path}");
        }
    }

    if let Some((commentator, spans)) = &status.coverage {
        println!();
        println!("Coverage for {commentator}: {} span(s)", spans.len());
        for span in spans {
            println!("  {}", span_label(span));
        }
    }
}

fn print_json(status: &Status) -> anyhow::Result<()> {
    let coverage = status.coverage.as_ref().map(|(commentator, spans)| {
        serde_json::json!({
            "commentator": commentator,
            "spans": spans,
        })
    });

    let output = serde_json::json!({
        "index_path": status.index_path,
        "exists": status.exists,
        "schema_version": status.schema_version,
        "parser_version": status.parser_version,
        "current_parser_version": PARSER_VERSION,
        "source_manifest_version": status.source_manifest_version,
        "sources": status.sources,
        "entries": status.entries,
        "rebuild_needed": status.rebuild_needed,
        "missing_sources": status.missing_sources,
        "coverage": coverage,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(status: &Status) {
    println!("key\tvalue");
    println!("index_path\t{}", status.index_path);
    println!("exists\t{}", status.exists);
    println!("schema_version\t{}", or_none(status.schema_version.as_ref()));
    println!("parser_version\t{}", or_none(status.parser_version.as_ref()));
    println!(
        "source_manifest_version\t{}",
        or_none(status.source_manifest_version.as_ref())
    );
    println!("sources\t{}", status.sources);
    println!("entries\t{}", status.entries);
    if let Some(rebuild) = status.rebuild_needed {
        println!("rebuild_needed\t{rebuild}");
    }
    for path in &status.missing_sources {
        println!("missing_source\t{path}");
    }
    if let Some((_, spans)) = &status.coverage {
        for span in spans {
            println!("coverage\t{}", span_label(span));
        }
    }
}
