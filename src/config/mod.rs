//! Project configuration and its resolution against command-line flags.

pub mod project;

use std::path::{Path, PathBuf};

use crate::api::OUTPUT_PREFIX;
use crate::error::Result;
use crate::oracle::DEFAULT_PARSER;

pub use project::{Project, CONFIG_FILE};

/// Settings for one run, after flags have overridden ada.toml.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub parser: PathBuf,
    pub prefix: String,
    pub keep_going: bool,
}

/// Values given on the command line; `None` defers to the project file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub parser: Option<PathBuf>,
    pub prefix: Option<String>,
    pub keep_going: Option<bool>,
}

impl Settings {
    /// Flags first, then ada.toml, then built-in defaults.
    pub fn resolve(project: &Project, overrides: Overrides) -> Self {
        Self {
            parser: overrides
                .parser
                .or_else(|| project.parser.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PARSER)),
            prefix: overrides
                .prefix
                .or_else(|| project.prefix.clone())
                .unwrap_or_else(|| OUTPUT_PREFIX.to_string()),
            keep_going: overrides.keep_going.or(project.keep_going).unwrap_or(true),
        }
    }

    /// Load the project governing `input` and apply `overrides`.
    pub fn for_input(input: &Path, overrides: Overrides) -> Result<Self> {
        let project = Project::for_input(input)?;
        Ok(Self::resolve(&project, overrides))
    }
}
