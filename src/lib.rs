//! Source-to-source reverse-mode automatic differentiation for APL dfns.
//!
//! A dfn is parsed by an external parser into a tree string, lowered to a
//! call-tree IR, differentiated with a table of adjoint rules, and
//! rendered back to APL as a gradient dfn.

pub mod api;
pub mod autodiff;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod ir;
pub mod lower;
pub mod oracle;
pub mod render;
pub mod syntax;

pub use config::project;
pub use error::{Error, Result};

// Re-export public API: `ada::differentiate_source()` etc.
pub use api::*;
