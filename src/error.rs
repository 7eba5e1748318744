//! Error types for parsing, selector compilation, and selection.

use thiserror::Error;

/// Which selector grammar produced a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Css,
    Xpath,
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grammar::Css => write!(f, "CSS"),
            Grammar::Xpath => write!(f, "XPath"),
        }
    }
}

/// Errors surfaced by document construction and selection.
#[derive(Debug, Error)]
pub enum Error {
    /// The external markup parser reported a failure.
    #[error("markup parse failed: {0}")]
    ParseMarkup(String),

    /// A tuple-tree had an invalid shape.
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    /// A CSS or XPath expression failed to compile.
    #[error("{grammar} selector syntax error at {pos}: {msg}")]
    SelectorSyntax {
        grammar: Grammar,
        pos: usize,
        msg: String,
    },

    /// A selector compiled but is structurally invalid
    /// (bad pseudo-class arguments, bad nth formula, unknown pseudo-class).
    #[error("invalid selector: {0}")]
    SelectorValidation(String),

    /// An XPath expression misused a value type at evaluation time.
    #[error("XPath type error: {0}")]
    XPathType(String),

    /// `select` was called without an accumulator in the context.
    #[error("select requires an accumulator in the context")]
    NoAccumulator,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
