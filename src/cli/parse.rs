use clap::Args;

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::core::passage::Passage;
use crate::parsing::reference::parse;
use crate::parsing::scan::scan;

#[derive(Args)]
pub struct ParseArgs {
    /// References to parse (or text to scan with --scan)
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Reject ambiguous references instead of guessing
    #[arg(long, conflicts_with = "scan")]
    pub strict: bool,

    /// Find every reference embedded in free text
    #[arg(long)]
    pub scan: bool,

    /// Book for bare "C:V" references while scanning
    #[arg(long, requires = "scan")]
    pub default_book: Option<String>,
}

/// Outcome for one input
struct Parsed {
    input: String,
    passages: Vec<Passage>,
    error: Option<String>,
}

#[allow(clippy::needless_pass_by_value)]
pub fn run(
    args: ParseArgs,
    _settings: &Settings,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let parsed: Vec<Parsed> = args
        .text
        .iter()
        .map(|input| {
            if args.scan {
                Parsed {
                    input: input.clone(),
                    passages: scan(input, args.default_book.as_deref()),
                    error: None,
                }
            } else {
                match parse(input, args.strict) {
                    Ok(passage) => Parsed {
                        input: input.clone(),
                        passages: vec![passage],
                        error: None,
                    },
                    Err(e) => Parsed {
                        input: input.clone(),
                        passages: Vec::new(),
                        error: Some(e.to_string()),
                    },
                }
            }
        })
        .collect();

    match format {
        OutputFormat::Text => print_text(&parsed, verbose),
        OutputFormat::Json => print_json(&parsed)?,
        OutputFormat::Tsv => print_tsv(&parsed),
    }

    let failed = parsed.iter().filter(|p| p.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} reference(s) could not be parsed", parsed.len());
    }
    Ok(())
}

fn print_text(parsed: &[Parsed], verbose: bool) {
    for item in parsed {
        if let Some(error) = &item.error {
            println!("{}: error: {error}", item.input);
            continue;
        }
        if item.passages.is_empty() {
            println!("{}: no references found", item.input);
            continue;
        }
        if parsed.len() > 1 || verbose {
            println!("{}", item.input);
        }
        for passage in &item.passages {
            if verbose {
                println!(
                    "  {} (book {}, chapters {}-{}, verses {}-{})",
                    passage,
                    passage.book_id(),
                    passage.chapter_start(),
                    passage.chapter_end(),
                    display_verse(passage.verse_start()),
                    display_verse(passage.verse_end())
                );
            } else {
                println!("{passage}");
            }
        }
    }
}

fn print_json(parsed: &[Parsed]) -> anyhow::Result<()> {
    let output: Vec<_> = parsed
        .iter()
        .map(|item| {
            let passages: Vec<_> = item
                .passages
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "label": p.normalized_label(),
                        "book_id": p.book_id(),
                        "book": p.book_name(),
                        "chapter_start": p.chapter_start(),
                        "verse_start": p.verse_start(),
                        "chapter_end": p.chapter_end(),
                        "verse_end": p.verse_end(),
                    })
                })
                .collect();
            serde_json::json!({
                "input": item.input,
                "passages": passages,
                "error": item.error,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(parsed: &[Parsed]) {
    println!("input\tlabel\tbook_id\tchapter_start\tverse_start\tchapter_end\tverse_end\terror");
    for item in parsed {
        if let Some(error) = &item.error {
            println!("{}\t\t\t\t\t\t\t{error}", item.input);
            continue;
        }
        for p in &item.passages {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
                item.input,
                p.normalized_label(),
                p.book_id(),
                p.chapter_start(),
                display_verse(p.verse_start()),
                p.chapter_end(),
                display_verse(p.verse_end())
            );
        }
    }
}

fn display_verse(verse: Option<u32>) -> String {
    verse.map_or_else(|| "-".to_string(), |v| v.to_string())
}
