pub mod diff;
pub mod hash;
pub mod tree;

use std::path::{Path, PathBuf};
use std::process;

use clap::Args;

use ada::config::{Overrides, Settings};
use ada::diagnostic::Diagnostic;
use ada::Outcome;

/// Flags shared by every subcommand that runs the parser.
#[derive(Args)]
pub struct InputArgs {
    /// APL source file containing `name←{…}` definitions
    pub input: PathBuf,
    /// Parser executable (default: from ada.toml, else `aplparse` on PATH)
    #[arg(long, value_name = "PATH")]
    pub parser: Option<PathBuf>,
}

/// Read the input file, exiting on error.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Combine flags with ada.toml, exiting on a bad configuration.
pub fn resolve_settings(input: &Path, overrides: Overrides) -> Settings {
    match Settings::for_input(input, overrides) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// Render a diagnostic for every failed dfn. Returns how many failed.
pub fn report_failures(outcomes: &[Outcome], input: &Path, source: &str) -> usize {
    let filename = input.display().to_string();
    let mut failed = 0;
    for outcome in outcomes {
        if let Err(err) = &outcome.result {
            Diagnostic::from_error(err, outcome.span).render(&filename, source);
            failed += 1;
        }
    }
    failed
}

/// Exit when the file defines nothing to work on.
pub fn require_dfns(outcomes: &[Outcome], input: &Path) {
    if outcomes.is_empty() {
        eprintln!("error: no dfn definitions found in '{}'", input.display());
        process::exit(1);
    }
}
