//! Document store: a flat id-indexed node table with traversal helpers.
//!
//! - Dense pre-order ids make document order ascending id order.
//! - Subtree ends make descendant walks O(1) range iteration.
//! - Built once from a tuple-tree, immutable thereafter.

pub mod builder;
pub mod document;
pub mod node;

pub use builder::build;
pub use document::{Document, ParseMode};
pub use node::{DataKind, Element, Node, NodeData, NodeId};
