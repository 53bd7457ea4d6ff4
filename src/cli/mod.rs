//! Command-line interface for bible-commentary.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **query**: Ranked commentary excerpts for a passage
//! - **index**: Build or refresh the index from a source manifest
//! - **parse**: Parse references, or scan text for them
//! - **status**: Show what the index contains and whether it is current
//!
//! ## Usage
//!
//! ```text
//! # Build the index from downloaded sources
//! bible-commentary index --manifest sources.json
//!
//! # Query a passage
//! bible-commentary query "Romans 8:28-30"
//!
//! # JSON output for scripting
//! bible-commentary query "Psalm 23" --format json
//!
//! # Find every reference in a sentence
//! bible-commentary parse --scan "See Rom 8:28 and 1 Cor 13:4-7."
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::catalog::store::CommentaryStore;
use crate::config::{Settings, ENV_DATA_DIR, ENV_INDEX_PATH};

pub mod index;
pub mod parse;
pub mod query;
pub mod status;

#[derive(Parser)]
#[command(name = "bible-commentary")]
#[command(version)]
#[command(about = "Index public-domain Bible commentary and retrieve excerpts by passage")]
#[command(
    long_about = "bible-commentary keeps a local SQLite index of commentary excerpts keyed by the passage they discuss.\n\nGiven a reference such as \"Romans 8:28-30\" it returns:\n- Excerpts ranked by how precisely they cover the passage\n- Preferred commentators first when scores are otherwise close\n- Attribution back to the source work"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Data directory (raw sources live under <DATA_DIR>/raw)
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,

    /// Index file [default: <DATA_DIR>/index/commentary.sqlite]
    #[arg(long = "index", global = true, env = ENV_INDEX_PATH)]
    pub index_path: Option<PathBuf>,
}

impl Cli {
    /// Settings from the global flags; per-command options refine them
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings::resolve(self.data_dir.clone(), self.index_path.clone(), None, None)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show commentary on a passage
    Query(query::QueryArgs),

    /// Build or refresh the commentary index
    Index(index::IndexArgs),

    /// Parse passage references
    Parse(parse::ParseArgs),

    /// Show index contents and build state
    Status(status::StatusArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Open the configured index, creating its schema if needed
pub(crate) fn open_index(settings: &Settings) -> anyhow::Result<CommentaryStore> {
    let mut store = CommentaryStore::open(&settings.index_path).with_context(|| {
        format!("Failed to open index at {}", settings.index_path.display())
    })?;
    store
        .init_schema()
        .context("Failed to initialize index schema")?;
    Ok(store)
}
