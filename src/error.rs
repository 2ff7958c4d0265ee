use thiserror::Error;

/// Everything that can abort the differentiation of a dfn.
///
/// Every variant names the construct that caused it. None of them are
/// recovered from: a dfn either yields a complete derivative or an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed parser tree: {reason} (at byte {offset})")]
    MalformedTree { reason: String, offset: usize },

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("cannot differentiate `{construct}`: sine (1○) and cosine (2○) are the only supported trig functions")]
    UnsupportedTrig { construct: String },

    #[error("cannot differentiate `{construct}`: matrix multiplication (+.×) is the only supported inner product")]
    UnsupportedInnerProduct { construct: String },

    #[error("cannot differentiate `{construct}`: {reason}")]
    UnsupportedRank { construct: String, reason: String },

    #[error("cannot differentiate `{construct}`: reduce only works with associative functions (+ ∧ ⌈ ⌊ ∨ ×)")]
    UnsupportedReduce { construct: String },

    #[error("illegal identifier `{0}`: variable names may not shadow primitives, operators or arguments, nor contain ∆ or ⍙")]
    IllegalIdentifier(String),

    #[error("no adjoint is defined for `{0}`")]
    MissingAdjoint(String),

    #[error("parser `{parser}` failed{}: {stderr}", .status.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    ParserFailed {
        parser: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>, offset: usize) -> Self {
        Error::MalformedTree {
            reason: reason.into(),
            offset,
        }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Error::UnsupportedConstruct(what.into())
    }

    /// Short, stable category name used in diagnostics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedTree { .. } => "MalformedTreeError",
            Error::UnsupportedConstruct(_) => "UnsupportedConstructError",
            Error::UnsupportedTrig { .. } => "UnsupportedTrigError",
            Error::UnsupportedInnerProduct { .. } => "UnsupportedInnerProductError",
            Error::UnsupportedRank { .. } => "UnsupportedRankError",
            Error::UnsupportedReduce { .. } => "UnsupportedReduceError",
            Error::IllegalIdentifier(_) => "IllegalIdentifierError",
            Error::MissingAdjoint(_) => "MissingAdjointError",
            Error::ParserFailed { .. } => "ParserError",
            Error::Io(_) => "IoError",
            Error::Config(_) => "ConfigError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_construct() {
        let err = Error::UnsupportedTrig {
            construct: "3○⍵".to_string(),
        };
        assert!(err.to_string().contains("3○⍵"));
        assert_eq!(err.kind(), "UnsupportedTrigError");
    }

    #[test]
    fn test_parser_failure_message() {
        let err = Error::ParserFailed {
            parser: "aplparse".to_string(),
            status: Some(2),
            stderr: "SYNTAX ERROR".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parser `aplparse` failed with exit code 2: SYNTAX ERROR"
        );
        let killed = Error::ParserFailed {
            parser: "aplparse".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert_eq!(killed.to_string(), "parser `aplparse` failed: ");
    }

    #[test]
    fn test_io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), "IoError");
    }
}
