//! Runtime settings and their resolution.
//!
//! Each setting is taken from, in priority order:
//! 1. Command-line argument
//! 2. Environment variable (handled by clap for the binary)
//! 3. Compiled default

use std::path::{Path, PathBuf};

use crate::matching::engine::CommentatorPriority;
use crate::utils::validation::parse_preference_list;

pub const ENV_DATA_DIR: &str = "BIBLE_COMMENTARY_DATA_DIR";
pub const ENV_INDEX_PATH: &str = "BIBLE_COMMENTARY_INDEX_PATH";
pub const ENV_PREFERRED_COMMENTATORS: &str = "BIBLE_COMMENTARY_PREFERRED_COMMENTATORS";
pub const ENV_MAX_EXCERPTS: &str = "BIBLE_COMMENTARY_MAX_EXCERPTS";

pub const DEFAULT_PREFERRED_COMMENTATORS: &str = "henry,calvin,gill,jfb,spurgeon";
pub const DEFAULT_MAX_EXCERPTS: usize = 8;

/// Resolved settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of downloaded corpora and the default index location
    pub data_dir: PathBuf,
    /// SQLite index file
    pub index_path: PathBuf,
    /// Commentators in preference order, lowercase
    pub preferred_commentators: Vec<String>,
    /// Default number of excerpts per query
    pub max_excerpts: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(None, None, None, None)
    }
}

impl Settings {
    /// Fill unset values with defaults. The index defaults to
    /// `<data_dir>/index/commentary.sqlite`.
    #[must_use]
    pub fn resolve(
        data_dir: Option<PathBuf>,
        index_path: Option<PathBuf>,
        preferred: Option<&str>,
        max_excerpts: Option<usize>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let index_path = index_path.unwrap_or_else(|| default_index_path(&data_dir));
        let preferred_commentators =
            parse_preference_list(preferred.unwrap_or(DEFAULT_PREFERRED_COMMENTATORS));

        Self {
            data_dir,
            index_path,
            preferred_commentators,
            max_excerpts: max_excerpts.unwrap_or(DEFAULT_MAX_EXCERPTS),
        }
    }

    /// Directory that manifest `local_path`s are relative to
    #[must_use]
    pub fn raw_root(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    #[must_use]
    pub fn priority(&self) -> CommentatorPriority {
        CommentatorPriority::from_order(&self.preferred_commentators)
    }
}

/// `~/.bible-commentary`, or a relative directory when no home is known
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".bible-commentary"))
        .unwrap_or_else(|| PathBuf::from(".bible-commentary"))
}

#[must_use]
pub fn default_index_path(data_dir: &Path) -> PathBuf {
    data_dir.join("index").join("commentary.sqlite")
}
