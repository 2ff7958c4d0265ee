//! Public entry points: from tree strings or source text to rendered
//! derivatives.

use std::path::{Path, PathBuf};

use crate::autodiff::differentiate;
use crate::error::Result;
use crate::ir::Function;
use crate::lower::lower;
use crate::oracle::TreeSource;
use crate::render::render_function;
use crate::syntax::{build, extract_dfns, Span};

#[cfg(test)]
mod tests;

/// Default prefix of the output file written next to the input.
pub const OUTPUT_PREFIX: &str = "d";

/// Lower a tree string to the forward function.
pub fn forward_tree(tree_str: &str) -> Result<Function> {
    let tree = build(tree_str)?;
    log::debug!("built tree `{}`", tree.name);
    lower(&tree)
}

/// Differentiate the dfn described by a tree string.
pub fn differentiate_tree(tree_str: &str) -> Result<Function> {
    differentiate(&forward_tree(tree_str)?)
}

/// Parse one dfn with `oracle` and render its derivative.
pub fn differentiate_source(source: &str, oracle: &dyn TreeSource) -> Result<String> {
    let tree_str = oracle.tree_string(source)?;
    Ok(render_function(&differentiate_tree(&tree_str)?))
}

/// Parse one dfn with `oracle` and render it back without differentiating.
pub fn forward_source(source: &str, oracle: &dyn TreeSource) -> Result<String> {
    let tree_str = oracle.tree_string(source)?;
    Ok(render_function(&forward_tree(&tree_str)?))
}

/// What happened to one dfn of a file.
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    /// Where the definition sits in the input.
    pub span: Span,
    pub result: Result<String>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Apply `step` to every dfn defined in `text`, in order. With
/// `keep_going` unset, stops after the first failure.
pub fn process_file(
    text: &str,
    keep_going: bool,
    mut step: impl FnMut(&str) -> Result<String>,
) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    for dfn in extract_dfns(text) {
        log::info!("differentiating {}", dfn.node.name);
        let result = step(&dfn.node.source);
        match &result {
            Ok(_) => log::info!("derivative of {} computed", dfn.node.name),
            Err(err) => log::warn!("{} failed: {}", dfn.node.name, err),
        }
        let failed = result.is_err();
        outcomes.push(Outcome {
            name: dfn.node.name,
            span: dfn.span,
            result,
        });
        if failed && !keep_going {
            break;
        }
    }
    outcomes
}

/// Differentiate every dfn in a source file.
pub fn differentiate_file(text: &str, oracle: &dyn TreeSource, keep_going: bool) -> Vec<Outcome> {
    process_file(text, keep_going, |source| differentiate_source(source, oracle))
}

/// The successful results, separated by blank lines.
pub fn join_outputs(outcomes: &[Outcome]) -> String {
    outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `dir/file.apl` becomes `dir/<prefix>file.apl`.
pub fn output_path(input: &Path, prefix: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", prefix, file_name))
}
