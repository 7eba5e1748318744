//! CSS selector front-end.
//!
//! Compiles CSS selector groups into the selector algebra.

pub mod lexer;
pub mod parser;

use crate::error::Result;
use crate::select::SelectorGroup;

/// Compile a CSS selector group (a top-level comma list) into selectors
/// for the driver. Results across the group are unioned in document order.
pub fn compile(input: &str) -> Result<SelectorGroup> {
    parser::parse(input)
}
