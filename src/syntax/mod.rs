//! Surface syntax: the parser oracle's tree strings, source spans, and dfn
//! definitions in source files.

pub mod source;
pub mod span;
pub mod tree;

pub use source::{extract_dfns, Dfn};
pub use span::{Span, Spanned};
pub use tree::{build, TreeNode};
