//! Selection driver.
//!
//! One depth-first pass over the scope drives every selector in the group
//! at once. A stage match with a combinator schedules the next selector
//! over the relation's candidates: descendant stages ride down the whole
//! subtree, child stages one level, sibling stages travel sideways along
//! the parent's child loop. Terminal matches are emitted at the node being
//! visited, so results arrive strictly in document order and the walk can
//! stop the moment the accumulator is complete.

use std::any::Any;
use std::collections::HashSet;

use tracing::trace;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::extract::Selection;
use crate::parse;
use crate::select::accumulator::{Accumulator, All, One};
use crate::select::context::Context;
use crate::select::{accepts, Relation, Selector};

/// A resolved walk scope: the document plus an optional subtree anchor.
pub struct Scope {
    pub(crate) doc: Document,
    pub(crate) anchor: Option<NodeId>,
}

impl Scope {
    /// Scope over a document, optionally anchored at one node's subtree.
    pub fn new(doc: Document, anchor: Option<NodeId>) -> Self {
        Scope { doc, anchor }
    }
}

/// Anything the driver can walk: a built document, raw HTML markup
/// (parsed on demand), or a previous selection (restricting the walk to
/// that node and its descendants).
pub trait Queryable {
    fn scope(&self) -> Result<Scope>;
}

impl Queryable for Document {
    fn scope(&self) -> Result<Scope> {
        Ok(Scope {
            doc: self.clone(),
            anchor: None,
        })
    }
}

impl Queryable for str {
    fn scope(&self) -> Result<Scope> {
        Ok(Scope {
            doc: parse::parse_html(self)?,
            anchor: None,
        })
    }
}

impl Queryable for String {
    fn scope(&self) -> Result<Scope> {
        self.as_str().scope()
    }
}

impl Queryable for Selection {
    fn scope(&self) -> Result<Scope> {
        Ok(Scope {
            doc: self.document().clone(),
            anchor: Some(self.id()),
        })
    }
}

/// Every matching node exactly once, in document order, deduplicated
/// across the selector group.
pub fn all<Q>(queryable: &Q, selectors: &[Box<dyn Selector>], ctx: &Context) -> Result<Vec<Selection>>
where
    Q: Queryable + ?Sized,
{
    let scope = queryable.scope()?;
    let mut acc = All::default();
    run(&scope, selectors, ctx, &mut acc)?;
    Ok(acc.into_results())
}

/// First result in document order; short-circuits the walk.
pub fn one<Q>(
    queryable: &Q,
    selectors: &[Box<dyn Selector>],
    ctx: &Context,
) -> Result<Option<Selection>>
where
    Q: Queryable + ?Sized,
{
    let scope = queryable.scope()?;
    let mut acc = One::default();
    run(&scope, selectors, ctx, &mut acc)?;
    Ok(acc.into_result())
}

/// Run the selection under the accumulator carried in the context and
/// return its final value. Fails with `NoAccumulator` when absent.
pub fn select<Q>(
    queryable: &Q,
    selectors: &[Box<dyn Selector>],
    mut ctx: Context,
) -> Result<Box<dyn Any>>
where
    Q: Queryable + ?Sized,
{
    let mut acc = ctx.accumulator.take().ok_or(Error::NoAccumulator)?;
    let scope = queryable.scope()?;
    run(&scope, selectors, &ctx, acc.as_mut())?;
    Ok(acc.finish())
}

fn run(
    scope: &Scope,
    group: &[Box<dyn Selector>],
    ctx: &Context,
    acc: &mut dyn Accumulator,
) -> Result<()> {
    trace!(
        selectors = group.len(),
        nodes = scope.doc.len(),
        anchored = scope.anchor.is_some(),
        "selection walk"
    );
    let mut walker = Walker {
        doc: &scope.doc,
        group,
        ctx: ctx.derive(),
        acc,
        seen: HashSet::new(),
    };
    match scope.anchor {
        Some(anchor) => {
            // Sibling stages escaping the anchor are dropped: the subtree
            // root is walked as if it had no parent.
            let mut escaped = Vec::new();
            walker.visit(anchor, &[], &mut escaped)?;
        }
        None => {
            for &root in scope.doc.root_ids() {
                let mut escaped = Vec::new();
                if walker.visit(root, &[], &mut escaped)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// A scheduled selector stage. `deep` stages apply through the whole
/// subtree, shallow ones to one child level only.
#[derive(Clone, Copy)]
struct Stage<'s> {
    selector: &'s dyn Selector,
    deep: bool,
}

/// A stage travelling sideways to following element siblings.
#[derive(Clone, Copy)]
struct SibStage<'s> {
    selector: &'s dyn Selector,
    once: bool,
}

struct Walker<'a, 's> {
    doc: &'a Document,
    group: &'s [Box<dyn Selector>],
    ctx: Context,
    acc: &'a mut dyn Accumulator,
    seen: HashSet<NodeId>,
}

impl<'a, 's> Walker<'a, 's> {
    /// Returns true when the accumulator completed and the walk must stop.
    fn visit(
        &mut self,
        id: NodeId,
        inherited: &[Stage<'s>],
        sibling_out: &mut Vec<SibStage<'s>>,
    ) -> Result<bool> {
        let mut downstream: Vec<Stage<'s>> =
            inherited.iter().copied().filter(|s| s.deep).collect();

        // Copy the slice handles out so iterating them does not hold a
        // borrow of `self` across the mutable `emit` calls below.
        let group: &'s [Box<dyn Selector>] = self.group;
        let group_stages = group.iter().map(|s| s.as_ref());
        let inherited_stages = inherited.iter().map(|s| s.selector);
        for sel in group_stages.chain(inherited_stages) {
            if !accepts(sel, self.doc, id, &self.ctx)? {
                continue;
            }
            match sel.combinator() {
                None => {
                    if self.emit(id)? {
                        return Ok(true);
                    }
                }
                Some(comb) => {
                    let next = comb.selector.as_ref();
                    match comb.relation {
                        Relation::Descendants => downstream.push(Stage {
                            selector: next,
                            deep: true,
                        }),
                        Relation::Children => downstream.push(Stage {
                            selector: next,
                            deep: false,
                        }),
                        Relation::NextSibling => sibling_out.push(SibStage {
                            selector: next,
                            once: true,
                        }),
                        Relation::NextSiblings => sibling_out.push(SibStage {
                            selector: next,
                            once: false,
                        }),
                    }
                }
            }
        }

        let mut pending: Vec<SibStage<'s>> = Vec::new();
        for &child in self.doc.children(id) {
            let is_element = self.doc.get(child).is_element();
            let mut stages = downstream.clone();
            if is_element {
                stages.extend(pending.iter().map(|s| Stage {
                    selector: s.selector,
                    deep: false,
                }));
            }
            let mut child_siblings = Vec::new();
            if self.visit(child, &stages, &mut child_siblings)? {
                return Ok(true);
            }
            if is_element {
                // `+` stages applied to this element only.
                pending.retain(|s| !s.once);
            }
            pending.extend(child_siblings);
        }
        Ok(false)
    }

    fn emit(&mut self, id: NodeId) -> Result<bool> {
        if self.seen.insert(id) {
            self.acc.include(Selection::new(self.doc.clone(), id));
            if self.acc.complete() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
