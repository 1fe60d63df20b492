//! Session configuration.
//!
//! Loads config from (later layers override earlier ones):
//! 1. Built-in defaults (the English 4.0 data files under `./data`)
//! 2. Global: `$XDG_CONFIG_HOME/linkgram/config.toml`
//! 3. Per-project: `.linkgram/config.toml`
//!
//! Relative paths are resolved by the engine against the process working
//! directory, as the defaults are.
//!
//! Example config.toml:
//! ```toml
//! dictionary = "/usr/share/link-grammar/en/4.0.dict"
//! library = "/usr/lib/liblink-grammar.so.4"
//!
//! [options]
//! linkage_limit = 100
//! max_parse_time = 10
//! ```

use crate::engine::ParseOption;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DICTIONARY: &str = "./data/4.0.dict";
pub const DEFAULT_POST_PROCESS: &str = "./data/4.0.knowledge";
pub const DEFAULT_CONSTITUENT: &str = "./data/4.0.constituent-knowledge";
pub const DEFAULT_AFFIX: &str = "./data/4.0.affix";

/// Engine parse options. Unset fields keep the engine's own default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptionsConfig {
    pub verbosity: Option<i32>,
    /// Upper bound on linkages enumerated per sentence.
    pub linkage_limit: Option<i32>,
    /// Seconds the engine may spend on one sentence.
    pub max_parse_time: Option<i32>,
    pub min_null_count: Option<i32>,
    pub max_null_count: Option<i32>,
}

impl ParseOptionsConfig {
    /// Options that are set, in a fixed order.
    pub fn settings(&self) -> impl Iterator<Item = (ParseOption, i32)> + '_ {
        [
            (ParseOption::Verbosity, self.verbosity),
            (ParseOption::LinkageLimit, self.linkage_limit),
            (ParseOption::MaxParseTime, self.max_parse_time),
            (ParseOption::MinNullCount, self.min_null_count),
            (ParseOption::MaxNullCount, self.max_null_count),
        ]
        .into_iter()
        .filter_map(|(option, value)| value.map(|v| (option, v)))
    }

    /// Field-wise override: set fields in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            verbosity: other.verbosity.or(self.verbosity),
            linkage_limit: other.linkage_limit.or(self.linkage_limit),
            max_parse_time: other.max_parse_time.or(self.max_parse_time),
            min_null_count: other.min_null_count.or(self.min_null_count),
            max_null_count: other.max_null_count.or(self.max_null_count),
        }
    }
}

/// Everything a [`ParserSession`](crate::ParserSession) needs at creation.
///
/// Fixed once the session exists; sessions never reread it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParserConfig {
    /// Main dictionary file.
    pub dictionary: PathBuf,
    /// Post-processing knowledge file.
    pub post_process: PathBuf,
    /// Constituent knowledge file, needed for constituent trees.
    pub constituent: PathBuf,
    /// Affix file used by the tokenizer.
    pub affix: PathBuf,
    /// Explicit engine library. When unset the loader searches
    /// `LINKGRAM_LIBRARY_PATH`, then the system library path.
    pub library: Option<PathBuf>,
    pub options: ParseOptionsConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dictionary: PathBuf::from(DEFAULT_DICTIONARY),
            post_process: PathBuf::from(DEFAULT_POST_PROCESS),
            constituent: PathBuf::from(DEFAULT_CONSTITUENT),
            affix: PathBuf::from(DEFAULT_AFFIX),
            library: None,
            options: ParseOptionsConfig::default(),
        }
    }
}

/// One configuration layer. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub dictionary: Option<PathBuf>,
    pub post_process: Option<PathBuf>,
    pub constituent: Option<PathBuf>,
    pub affix: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub options: ParseOptionsConfig,
}

impl ConfigOverrides {
    /// Read one layer from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Borrowed view of the four dictionary paths, in engine argument order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DictionaryPaths<'a> {
    pub dictionary: &'a Path,
    pub post_process: &'a Path,
    pub constituent: &'a Path,
    pub affix: &'a Path,
}

impl ParserConfig {
    /// Load configuration for a project root.
    ///
    /// Missing files are skipped; files that exist but fail to parse are
    /// errors.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            config = config.merge_file(&global_path)?;
        }

        let project_path = root.join(".linkgram").join("config.toml");
        config.merge_file(&project_path)
    }

    /// Defaults overridden by a single file, which must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::default().merge(ConfigOverrides::from_file(path)?))
    }

    /// Apply `path` on top of `self` if it exists.
    pub fn merge_file(self, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(self);
        }
        Ok(self.merge(ConfigOverrides::from_file(path)?))
    }

    /// Apply one override layer.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            dictionary: other.dictionary.unwrap_or(self.dictionary),
            post_process: other.post_process.unwrap_or(self.post_process),
            constituent: other.constituent.unwrap_or(self.constituent),
            affix: other.affix.unwrap_or(self.affix),
            library: other.library.or(self.library),
            options: self.options.merge(other.options),
        }
    }

    pub(crate) fn dictionary_paths(&self) -> DictionaryPaths<'_> {
        DictionaryPaths {
            dictionary: &self.dictionary,
            post_process: &self.post_process,
            constituent: &self.constituent,
            affix: &self.affix,
        }
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::config_dir)?;
        Some(config_home.join("linkgram").join("config.toml"))
    }
}
