//! Guard configuration parsing from git config.

use bstr::ByteSlice;
use gix_config::File;

use crate::{Error, Keyword};

/// Configuration for the submodule guard.
///
/// Nothing needs to be configured; without any settings the guard is enabled and looks
/// for the word `submodule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// The word a commit changing a submodule has to mention.
    pub keyword: Keyword,
    /// If false, every transition is accepted without looking at it.
    pub enabled: bool,
}

impl GuardConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            keyword: Keyword::default(),
            enabled: true,
        }
    }

    /// Load the guard configuration from a git config file.
    ///
    /// Recognized keys:
    /// - `submoduleGuard.keyword`: the required word (default: `submodule`)
    /// - `submoduleGuard.enabled`: whether to evaluate at all (default: true)
    pub fn from_config(config: &File<'_>) -> Result<Self, Error> {
        let mut guard_config = Self::new();

        if let Some(value) = config.string("submoduleGuard.keyword") {
            let text = value
                .to_str()
                .map_err(|_| Error::Config("'submoduleGuard.keyword' is not valid UTF-8".into()))?;
            guard_config.keyword = Keyword::new(text)?;
        }

        if let Some(result) = config.boolean("submoduleGuard.enabled") {
            match result {
                Ok(value) => guard_config.enabled = value,
                Err(e) => {
                    return Err(Error::Config(format!(
                        "invalid boolean value for 'submoduleGuard.enabled': {e}"
                    )))
                }
            }
        }

        Ok(guard_config)
    }

    /// Replace the keyword, typically with one given on the command line.
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keyword = keyword;
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}
