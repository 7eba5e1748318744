//! XPath evaluation engine.
//!
//! A stack machine over the compiled ops. Location steps apply their
//! predicates per context node, so `position()`/`last()` are scoped to
//! each context node's axis list, and the merged result is deduplicated
//! and sorted back to document order.

use std::collections::HashSet;
use std::sync::Arc;

use super::axes::{matches_node_test, navigate, Axis};
use super::compiler::{self, CompiledExpr, CompiledStep, Op, Pred};
use super::parser::{BinaryOp, NodeTest};
use super::value::XPathValue;
use super::DOCUMENT_NODE;
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::select::Context;

/// Evaluation context for one expression. The selection context rides
/// along so predicate evaluation can derive fresh contexts carrying
/// `nodes`/`position`/`last`, and user keys pass through untouched.
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub ctx: Context,
}

/// Evaluate an XPath expression against a document.
pub fn evaluate(doc: &Document, xpath: &str) -> Result<XPathValue> {
    let compiled = compiler::compile(xpath)?;
    let ctx = EvalContext {
        doc,
        node: DOCUMENT_NODE,
        ctx: Context::new(),
    };
    evaluate_compiled(&compiled, &ctx)
}

/// Evaluate an XPath expression from a specific context node.
pub fn evaluate_from_node(doc: &Document, node: NodeId, xpath: &str) -> Result<XPathValue> {
    let compiled = compiler::compile(xpath)?;
    let ctx = EvalContext {
        doc,
        node,
        ctx: Context::new(),
    };
    evaluate_compiled(&compiled, &ctx)
}

/// XPath string-value of a node, with the virtual document node resolving
/// to the concatenated string-value of the roots.
pub(crate) fn node_string(doc: &Document, id: NodeId) -> String {
    if id == DOCUMENT_NODE {
        doc.root_ids()
            .iter()
            .map(|&root| doc.string_value(root))
            .collect()
    } else {
        doc.string_value(id)
    }
}

/// XPath string() coercion with document access for node-sets.
pub(crate) fn resolve_string(doc: &Document, value: &XPathValue) -> String {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map(|&id| node_string(doc, id))
            .unwrap_or_default(),
        other => other.string(),
    }
}

/// XPath number() coercion with document access for node-sets.
pub(crate) fn resolve_number(doc: &Document, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(nodes) => match nodes.first() {
            Some(&id) => node_string(doc, id).trim().parse().unwrap_or(f64::NAN),
            None => f64::NAN,
        },
        other => other.number(),
    }
}

/// Evaluate a compiled expression.
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue> {
    let doc = ctx.doc;
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                stack.push(XPathValue::node(DOCUMENT_NODE));
            }

            Op::Context => {
                stack.push(XPathValue::node(ctx.node));
            }

            Op::Step(step) => {
                let current = pop_nodeset(&mut stack, ctx, "location step")?;
                if step.axis == Axis::Attribute {
                    stack.push(attribute_step(doc, &current, step));
                } else {
                    let mut seen = HashSet::with_capacity(current.len() * 4);
                    let mut result = Vec::with_capacity(current.len() * 4);
                    for node in current {
                        let mut axis_list: Vec<NodeId> = navigate(doc, node, step.axis)
                            .into_iter()
                            .filter(|&candidate| {
                                matches_node_test(doc, candidate, &step.node_test)
                            })
                            .collect();
                        // Predicates scope positions to this context node's
                        // axis list, before the merge.
                        for pred in &step.predicates {
                            axis_list = apply_pred(doc, axis_list, pred, &ctx.ctx)?;
                        }
                        for candidate in axis_list {
                            if seen.insert(candidate) {
                                result.push(candidate);
                            }
                        }
                    }
                    result.sort_unstable();
                    stack.push(XPathValue::NodeSet(result));
                }
            }

            Op::Predicate(pred_expr) => {
                let current = pop_nodeset(&mut stack, ctx, "predicate")?;
                let filtered = apply_expr_pred(doc, current, pred_expr, &ctx.ctx)?;
                stack.push(XPathValue::NodeSet(filtered));
            }

            Op::Union => {
                let right = stack.pop().unwrap_or_default();
                let left = stack.pop().unwrap_or_default();
                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut result = l;
                        result.reserve(r.len());
                        for node in r {
                            if seen.insert(node) {
                                result.push(node);
                            }
                        }
                        result.sort_unstable();
                        stack.push(XPathValue::NodeSet(result));
                    }
                    _ => {
                        return Err(Error::XPathType(
                            "| requires node-sets on both sides".to_string(),
                        ));
                    }
                }
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Negate => {
                let value = stack.pop().unwrap_or(XPathValue::Number(0.0));
                stack.push(XPathValue::Number(-resolve_number(doc, &value)));
            }

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or(XPathValue::Number(0.0));
                let left = stack.pop().unwrap_or(XPathValue::Number(0.0));
                stack.push(binary_op(doc, &left, *op, &right));
            }

            Op::Call(name, arg_count) => {
                let mut args = Vec::with_capacity(*arg_count);
                for _ in 0..*arg_count {
                    args.push(stack.pop().unwrap_or_default());
                }
                args.reverse();
                stack.push(super::functions::call(name, args, ctx)?);
            }
        }
    }

    Ok(stack.pop().unwrap_or_default())
}

fn pop_nodeset(
    stack: &mut Vec<XPathValue>,
    ctx: &EvalContext<'_>,
    what: &str,
) -> Result<Vec<NodeId>> {
    let value = stack.pop().unwrap_or_else(|| XPathValue::node(ctx.node));
    value
        .into_nodeset()
        .ok_or_else(|| Error::XPathType(format!("{} applied to a non-node-set", what)))
}

/// The attribute axis yields string values, not nodes.
fn attribute_step(doc: &Document, current: &[NodeId], step: &CompiledStep) -> XPathValue {
    let mut values: Vec<String> = Vec::new();
    for &node in current {
        if node == DOCUMENT_NODE {
            continue;
        }
        let Some(elem) = doc.get(node).as_element() else {
            continue;
        };
        match &step.node_test {
            NodeTest::Wildcard => {
                for (_, value) in &elem.attributes {
                    values.push(value.clone());
                }
            }
            NodeTest::Named(name) => {
                if let Some(value) = doc.attribute(node, name) {
                    values.push(value.to_string());
                }
            }
            NodeTest::Prefixed(prefix, local) => {
                let qualified = format!("{}:{}", prefix, local);
                if let Some(value) = doc.attribute(node, &qualified) {
                    values.push(value.to_string());
                }
            }
            _ => {}
        }
    }
    if values.is_empty() {
        XPathValue::empty()
    } else if values.len() == 1 {
        XPathValue::String(values.pop().unwrap())
    } else {
        XPathValue::StringList(values)
    }
}

fn apply_pred(
    doc: &Document,
    nodes: Vec<NodeId>,
    pred: &Pred,
    base: &Context,
) -> Result<Vec<NodeId>> {
    match pred {
        Pred::Position(n) => Ok(nodes.get(n - 1).copied().into_iter().collect()),
        Pred::AttrEq(name, value) => Ok(nodes
            .into_iter()
            .filter(|&id| {
                id != DOCUMENT_NODE && doc.attribute(id, name) == Some(value.as_str())
            })
            .collect()),
        Pred::Expr(expr) => apply_expr_pred(doc, nodes, expr, base),
    }
}

fn apply_expr_pred(
    doc: &Document,
    nodes: Vec<NodeId>,
    expr: &CompiledExpr,
    base: &Context,
) -> Result<Vec<NodeId>> {
    let size = nodes.len();
    let shared = Arc::new(nodes.clone());
    let mut filtered = Vec::new();
    for (i, &node) in nodes.iter().enumerate() {
        // Fresh derived context per node; the caller's is never touched.
        let pred_ctx = EvalContext {
            doc,
            node,
            ctx: base.derive_step(shared.clone(), i + 1, size),
        };
        let value = evaluate_compiled(expr, &pred_ctx)?;
        // A numeric predicate accepts the node at that position.
        let keep = match value {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.boolean(),
        };
        if keep {
            filtered.push(node);
        }
    }
    Ok(filtered)
}

fn binary_op(doc: &Document, left: &XPathValue, op: BinaryOp, right: &XPathValue) -> XPathValue {
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.boolean() || right.boolean()),
        BinaryOp::And => XPathValue::Boolean(left.boolean() && right.boolean()),
        BinaryOp::Eq => XPathValue::Boolean(equals(doc, left, right)),
        BinaryOp::Ne => XPathValue::Boolean(!equals(doc, left, right)),
        BinaryOp::Lt => XPathValue::Boolean(compare(doc, left, right, |a, b| a < b)),
        BinaryOp::Le => XPathValue::Boolean(compare(doc, left, right, |a, b| a <= b)),
        BinaryOp::Gt => XPathValue::Boolean(compare(doc, left, right, |a, b| a > b)),
        BinaryOp::Ge => XPathValue::Boolean(compare(doc, left, right, |a, b| a >= b)),
        BinaryOp::Add => {
            XPathValue::Number(resolve_number(doc, left) + resolve_number(doc, right))
        }
        BinaryOp::Sub => {
            XPathValue::Number(resolve_number(doc, left) - resolve_number(doc, right))
        }
        BinaryOp::Mul => {
            XPathValue::Number(resolve_number(doc, left) * resolve_number(doc, right))
        }
        BinaryOp::Div => {
            XPathValue::Number(resolve_number(doc, left) / resolve_number(doc, right))
        }
        BinaryOp::Mod => {
            XPathValue::Number(resolve_number(doc, left) % resolve_number(doc, right))
        }
    }
}

/// XPath `=` semantics: multi-valued operands compare existentially.
fn equals(doc: &Document, left: &XPathValue, right: &XPathValue) -> bool {
    use XPathValue::*;
    match (left, right) {
        (NodeSet(a), NodeSet(b)) => a
            .iter()
            .any(|&l| b.iter().any(|&r| node_string(doc, l) == node_string(doc, r))),
        (NodeSet(nodes), other) | (other, NodeSet(nodes)) => match other {
            Boolean(b) => !nodes.is_empty() == *b,
            Number(n) => nodes
                .iter()
                .any(|&id| node_string(doc, id).trim().parse::<f64>() == Ok(*n)),
            String(s) => nodes.iter().any(|&id| node_string(doc, id) == *s),
            StringList(list) => nodes
                .iter()
                .any(|&id| list.iter().any(|s| node_string(doc, id) == *s)),
            NodeSet(_) => unreachable!(),
        },
        (StringList(list), other) | (other, StringList(list)) => match other {
            Boolean(b) => !list.is_empty() == *b,
            Number(n) => list.iter().any(|s| s.trim().parse::<f64>() == Ok(*n)),
            String(s) => list.iter().any(|v| v == s),
            StringList(other_list) => list.iter().any(|v| other_list.contains(v)),
            NodeSet(_) => unreachable!(),
        },
        (Boolean(a), other) | (other, Boolean(a)) => *a == other.boolean(),
        (Number(a), other) | (other, Number(a)) => *a == other.number(),
        (String(a), String(b)) => a == b,
    }
}

/// Relational comparison: numeric, existential over multi-valued operands.
fn compare(
    doc: &Document,
    left: &XPathValue,
    right: &XPathValue,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    let lhs = numbers_of(doc, left);
    let rhs = numbers_of(doc, right);
    lhs.iter().any(|&l| rhs.iter().any(|&r| cmp(l, r)))
}

fn numbers_of(doc: &Document, value: &XPathValue) -> Vec<f64> {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .map(|&id| node_string(doc, id).trim().parse().unwrap_or(f64::NAN))
            .collect(),
        XPathValue::StringList(list) => list
            .iter()
            .map(|s| s.trim().parse().unwrap_or(f64::NAN))
            .collect(),
        other => vec![other.number()],
    }
}
