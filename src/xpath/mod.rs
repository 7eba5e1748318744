//! XPath front-end and evaluator.
//!
//! The supported subset: absolute and relative location paths, `//`,
//! predicates, the forward/reverse axes of the store, node-type tests,
//! the core function set, and full expression arithmetic. Compiled
//! expressions are cached and conform to the selector algebra.

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use eval::{evaluate, evaluate_from_node};
pub use value::XPathValue;

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::dom::{Document, NodeId};
use crate::error::{Error, Grammar, Result};
use crate::select::{Context, Selector, SelectorGroup};
use self::axes::Axis;
use self::compiler::{CompiledExpr, Op};
use self::eval::EvalContext;

/// The virtual document node above the root list. Never appears in
/// selection results.
pub(crate) const DOCUMENT_NODE: NodeId = NodeId::MAX;

/// Compile an XPath expression into a single-selector group for the
/// driver. The expression must produce a node-set.
pub fn compile(input: &str) -> Result<SelectorGroup> {
    let compiled = compiler::compile(input)?;
    if let Some(Op::Step(step)) = compiled.ops.last() {
        if step.axis == Axis::Attribute {
            return Err(Error::SelectorSyntax {
                grammar: Grammar::Xpath,
                pos: 0,
                msg: "attribute axis cannot produce selection results".to_string(),
            });
        }
    }
    Ok(vec![Box::new(XPathExpr::new(input.to_string(), compiled))])
}

/// A compiled XPath expression conforming to the selector algebra.
///
/// Terminal: no combinator, no filters. A node matches when it is a
/// member of the expression's node-set for the document at hand; the
/// node-set is memoized per document instance.
pub struct XPathExpr {
    source: String,
    compiled: CompiledExpr,
    memo: Mutex<Option<(u64, Arc<Vec<NodeId>>)>>,
}

impl XPathExpr {
    fn new(source: String, compiled: CompiledExpr) -> Self {
        XPathExpr {
            source,
            compiled,
            memo: Mutex::new(None),
        }
    }

    fn node_set(&self, doc: &Document, ctx: &Context) -> Result<Arc<Vec<NodeId>>> {
        let key = doc.instance_id();
        if let Some((cached_key, set)) = self.memo.lock().unwrap().as_ref() {
            if *cached_key == key {
                return Ok(set.clone());
            }
        }

        let eval_ctx = EvalContext {
            doc,
            node: DOCUMENT_NODE,
            ctx: ctx.derive(),
        };
        let value = eval::evaluate_compiled(&self.compiled, &eval_ctx)?;
        let mut nodes = value.into_nodeset().ok_or_else(|| {
            Error::XPathType(format!(
                "expression {:?} does not produce a node-set",
                self.source
            ))
        })?;
        nodes.retain(|&id| id != DOCUMENT_NODE);

        let set = Arc::new(nodes);
        *self.memo.lock().unwrap() = Some((key, set.clone()));
        Ok(set)
    }
}

impl fmt::Debug for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPathExpr").field(&self.source).finish()
    }
}

impl Selector for XPathExpr {
    fn matches(&self, doc: &Document, id: NodeId, ctx: &Context) -> Result<bool> {
        // The evaluator returns sorted node-sets.
        Ok(self.node_set(doc, ctx)?.binary_search(&id).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_returns_single_selector() {
        let group = compile("//li[2]").unwrap();
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_attribute_tail_is_rejected() {
        let err = compile("//b/@x").unwrap_err();
        assert!(matches!(
            err,
            Error::SelectorSyntax {
                grammar: Grammar::Xpath,
                ..
            }
        ));
    }

    #[test]
    fn test_matches_is_nodeset_membership() {
        let doc = crate::parse_xml("<root><a/><b/></root>").unwrap();
        let group = compile("//b").unwrap();
        let ctx = Context::new();
        assert!(group[0].matches(&doc, 2, &ctx).unwrap());
        assert!(!group[0].matches(&doc, 1, &ctx).unwrap());
    }

    #[test]
    fn test_memo_survives_document_switch() {
        let doc_a = crate::parse_xml("<root><b/></root>").unwrap();
        let doc_b = crate::parse_xml("<other><b/><b/></other>").unwrap();
        let group = compile("//b").unwrap();
        let ctx = Context::new();
        assert!(group[0].matches(&doc_a, 1, &ctx).unwrap());
        assert!(group[0].matches(&doc_b, 1, &ctx).unwrap());
        assert!(group[0].matches(&doc_b, 2, &ctx).unwrap());
        assert!(group[0].matches(&doc_a, 1, &ctx).unwrap());
    }

    #[test]
    fn test_non_nodeset_expression_errors_at_match() {
        let doc = crate::parse_xml("<root/>").unwrap();
        let group = compile("count(//root)").unwrap();
        let err = group[0].matches(&doc, 0, &Context::new()).unwrap_err();
        assert!(matches!(err, Error::XPathType(_)));
    }
}
