//! Bridge to the external APL parser.
//!
//! The parser reads a source file and prints a single-line tree string on
//! stdout. Each dfn is written to a scoped temporary file, which is
//! removed when the call returns, on success and failure alike.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};

/// Executable name used when neither the command line nor `ada.toml`
/// names a parser.
pub const DEFAULT_PARSER: &str = "aplparse";

/// Anything that turns dfn source text into a tree string.
pub trait TreeSource {
    fn tree_string(&self, source: &str) -> Result<String>;
}

/// Runs a parser executable as a blocking subprocess.
#[derive(Clone, Debug)]
pub struct ParserOracle {
    program: PathBuf,
}

impl ParserOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ParserOracle {
    fn default() -> Self {
        Self::new(DEFAULT_PARSER)
    }
}

impl TreeSource for ParserOracle {
    fn tree_string(&self, source: &str) -> Result<String> {
        let mut input = tempfile::Builder::new()
            .prefix("ada")
            .suffix(".apl")
            .tempfile()?;
        input.write_all(source.as_bytes())?;
        input.flush()?;

        log::debug!(
            "running {} on {}",
            self.program.display(),
            input.path().display()
        );
        let output = Command::new(&self.program).arg(input.path()).output()?;
        if !output.status.success() {
            return Err(Error::ParserFailed {
                parser: self.program.display().to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// A fixed mapping from source text to tree strings, for callers that
/// already hold parsed trees.
impl<F> TreeSource for F
where
    F: Fn(&str) -> Result<String>,
{
    fn tree_string(&self, source: &str) -> Result<String> {
        self(source)
    }
}
