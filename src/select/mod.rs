//! Selector algebra.
//!
//! Every way of describing nodes (CSS compounds, compiled XPath
//! expressions, user-defined matchers) conforms to the one narrow
//! capability below, and the driver treats them uniformly.

pub mod accumulator;
pub mod context;
pub mod driver;
pub mod matchers;
pub mod nth;

pub use accumulator::{Accumulator, All, One};
pub use context::Context;
pub use driver::{all, one, select, Queryable, Scope};
pub use matchers::{AttrMatcher, AttrOp, Compound, Kind, Matcher, Pseudo};
pub use nth::Nth;

use crate::dom::{Document, NodeId};
use crate::error::Result;

/// The capability every selector satisfies.
///
/// `matches` is fallible because XPath evaluation can fail at runtime and
/// those errors abort the selection.
pub trait Selector: std::fmt::Debug + Send + Sync {
    /// Does this single node satisfy the selector here and now?
    fn matches(&self, doc: &Document, id: NodeId, ctx: &Context) -> Result<bool>;

    /// Which nodes the next selector in the chain applies to, if any.
    /// Absent means terminal: this selector alone decides the match.
    fn combinator(&self) -> Option<&Combinator> {
        None
    }

    /// Extra selectors applied to the candidate before it is accepted.
    fn filters(&self) -> Option<&[Box<dyn Selector>]> {
        None
    }

    /// Structural validation at compile time.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A compiled selector group: the comma list of a CSS selector, or a
/// single-entry group for XPath and user selectors. The driver unions
/// group results in document order.
pub type SelectorGroup = Vec<Box<dyn Selector>>;

/// The relation between two chained selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// All descendants of the matched node.
    Descendants,
    /// Direct children of the matched node.
    Children,
    /// The first element sibling after the matched node.
    NextSibling,
    /// All element siblings after the matched node.
    NextSiblings,
}

/// A combinator: the relation plus the next selector in the chain.
#[derive(Debug)]
pub struct Combinator {
    pub relation: Relation,
    pub selector: Box<dyn Selector>,
}

impl Combinator {
    pub fn new(relation: Relation, selector: Box<dyn Selector>) -> Self {
        Combinator { relation, selector }
    }
}

/// A node is accepted by a selector when it matches and every filter
/// entry matches too.
pub(crate) fn accepts(
    sel: &dyn Selector,
    doc: &Document,
    id: NodeId,
    ctx: &Context,
) -> Result<bool> {
    if !sel.matches(doc, id, ctx)? {
        return Ok(false);
    }
    if let Some(filters) = sel.filters() {
        for filter in filters {
            if !accepts(filter.as_ref(), doc, id, ctx)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Candidate nodes a combinator relation yields for a matched node.
pub(crate) fn relation_candidates(doc: &Document, id: NodeId, relation: Relation) -> Vec<NodeId> {
    match relation {
        Relation::Descendants => doc.descendants(id).collect(),
        Relation::Children => doc.children(id).to_vec(),
        Relation::NextSibling => doc
            .following_siblings(id)
            .iter()
            .copied()
            .find(|&sib| doc.get(sib).is_element())
            .into_iter()
            .collect(),
        Relation::NextSiblings => doc
            .following_siblings(id)
            .iter()
            .copied()
            .filter(|&sib| doc.get(sib).is_element())
            .collect(),
    }
}

/// Whether a full selector chain (selector, filters, and combinator tail)
/// is satisfiable starting at `id`. Used by `:has` and anchored checks,
/// not by the driver's streaming walk.
pub(crate) fn chain_matches(
    sel: &dyn Selector,
    doc: &Document,
    id: NodeId,
    ctx: &Context,
) -> Result<bool> {
    if !accepts(sel, doc, id, ctx)? {
        return Ok(false);
    }
    match sel.combinator() {
        None => Ok(true),
        Some(comb) => {
            for candidate in relation_candidates(doc, id, comb.relation) {
                if chain_matches(comb.selector.as_ref(), doc, candidate, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
