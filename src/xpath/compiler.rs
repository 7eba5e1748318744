//! XPath expression compiler.
//!
//! Compiles parsed expressions into a stack-machine representation and
//! keeps a global LRU cache of compiled expressions so repeated queries
//! skip the parser.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::axes::Axis;
use super::parser::{self, BinaryOp, Expr, NodeTest, PathOp, Start, Step};
use crate::error::{Error, Grammar, Result};

/// Global LRU cache for compiled XPath expressions.
static XPATH_CACHE: Mutex<Option<LruCache<String, CompiledExpr>>> = Mutex::new(None);

/// Cache capacity, sized for typical query-reuse patterns.
const CACHE_CAPACITY: usize = 256;

/// Functions known to the evaluator; anything else fails at compile time.
const KNOWN_FUNCTIONS: [&str; 12] = [
    "position",
    "last",
    "count",
    "name",
    "local-name",
    "not",
    "true",
    "false",
    "string",
    "contains",
    "starts-with",
    "normalize-space",
];

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document root onto the stack
    Root,
    /// Push the context node onto the stack
    Context,
    /// Apply a location step (axis, node test, predicates) per context node
    Step(Box<CompiledStep>),
    /// Apply a predicate to a filter expression's merged node-set
    Predicate(Box<CompiledExpr>),
    /// Union two node-sets
    Union,
    /// Push a literal number
    Number(f64),
    /// Push a literal string
    String(String),
    /// Call a function: name, argument count
    Call(String, usize),
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
}

/// A location step with its predicates attached, so the evaluator can
/// scope positions to each context node's axis list.
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Pred>,
}

/// A compiled predicate, with fast paths for the two common shapes.
#[derive(Debug, Clone)]
pub enum Pred {
    /// `[n]`
    Position(usize),
    /// `[@name = "value"]`
    AttrEq(String, String),
    /// Anything else
    Expr(CompiledExpr),
}

impl CompiledExpr {
    /// Compile a parsed expression
    pub fn compile(expr: &Expr) -> Result<Self> {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) -> Result<()> {
        match expr {
            Expr::Number(n) => {
                ops.push(Op::Number(*n));
            }
            Expr::Literal(s) => {
                ops.push(Op::String(s.clone()));
            }
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary { op, lhs, rhs } => {
                Self::compile_expr(lhs, ops)?;
                Self::compile_expr(rhs, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(branches) => {
                let mut iter = branches.iter();
                if let Some(first) = iter.next() {
                    Self::compile_expr(first, ops)?;
                }
                for branch in iter {
                    Self::compile_expr(branch, ops)?;
                    ops.push(Op::Union);
                }
            }
            Expr::Path(path) => {
                match &path.start {
                    Start::Root => ops.push(Op::Root),
                    Start::Here => ops.push(Op::Context),
                    Start::Sub(sub) => Self::compile_expr(sub, ops)?,
                }
                for op in &path.ops {
                    match op {
                        PathOp::Step(step) => Self::compile_step(step, ops)?,
                        PathOp::Predicate(pred) => {
                            let compiled = CompiledExpr::compile(pred)?;
                            ops.push(Op::Predicate(Box::new(compiled)));
                        }
                    }
                }
            }
            Expr::Call(name, args) => {
                if !KNOWN_FUNCTIONS.contains(&name.as_str()) {
                    return Err(syntax_error(format!("unknown function: {}()", name)));
                }
                for arg in args {
                    Self::compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(step: &Step, ops: &mut Vec<Op>) -> Result<()> {
        let mut predicates = Vec::with_capacity(step.predicates.len());
        for pred in &step.predicates {
            predicates.push(Self::compile_pred(pred)?);
        }
        ops.push(Op::Step(Box::new(CompiledStep {
            axis: step.axis,
            node_test: step.node_test.clone(),
            predicates,
        })));
        Ok(())
    }

    /// Use fast-path predicate forms for common patterns.
    fn compile_pred(pred: &Expr) -> Result<Pred> {
        match pred {
            // [n] position predicate
            Expr::Number(n) if *n > 0.0 && n.fract() == 0.0 => Ok(Pred::Position(*n as usize)),

            // [@attr = 'value'] in either order
            Expr::Binary {
                op: BinaryOp::Eq,
                lhs,
                rhs,
            } => {
                if let (Some(name), Some(value)) =
                    (attribute_name_of(lhs), string_literal_of(rhs))
                {
                    return Ok(Pred::AttrEq(name, value));
                }
                if let (Some(value), Some(name)) =
                    (string_literal_of(lhs), attribute_name_of(rhs))
                {
                    return Ok(Pred::AttrEq(name, value));
                }
                Ok(Pred::Expr(CompiledExpr::compile(pred)?))
            }

            _ => Ok(Pred::Expr(CompiledExpr::compile(pred)?)),
        }
    }
}

/// The attribute name of a bare `@name` path, if that is what this is.
fn attribute_name_of(expr: &Expr) -> Option<String> {
    let Expr::Path(path) = expr else {
        return None;
    };
    if !matches!(path.start, Start::Here) || path.ops.len() != 1 {
        return None;
    }
    let PathOp::Step(step) = &path.ops[0] else {
        return None;
    };
    if step.axis != Axis::Attribute || !step.predicates.is_empty() {
        return None;
    }
    match &step.node_test {
        NodeTest::Named(name) => Some(name.clone()),
        _ => None,
    }
}

fn string_literal_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(s) => Some(s.clone()),
        _ => None,
    }
}

fn syntax_error(msg: String) -> Error {
    Error::SelectorSyntax {
        grammar: Grammar::Xpath,
        pos: 0,
        msg,
    }
}

/// Compile an XPath expression string, with caching.
pub fn compile(xpath: &str) -> Result<CompiledExpr> {
    {
        let mut guard = XPATH_CACHE.lock().unwrap();
        let cache = guard
            .get_or_insert_with(|| LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap()));
        if let Some(compiled) = cache.get(xpath) {
            return Ok(compiled.clone());
        }
    }

    let expr = parser::parse(xpath)?;
    let compiled = CompiledExpr::compile(&expr)?;

    {
        let mut guard = XPATH_CACHE.lock().unwrap();
        let cache = guard
            .get_or_insert_with(|| LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap()));
        cache.put(xpath.to_string(), compiled.clone());
    }

    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(compiled.ops[1], Op::Step(_)));
    }

    #[test]
    fn test_compile_caches() {
        let first = compile("//cached-item").unwrap();
        let second = compile("//cached-item").unwrap();
        assert_eq!(first.ops.len(), second.ops.len());
    }

    #[test]
    fn test_position_fast_path() {
        let compiled = compile("//li[2]").unwrap();
        let step = compiled
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                Op::Step(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert!(matches!(step.predicates[0], Pred::Position(2)));
    }

    #[test]
    fn test_attr_eq_fast_path() {
        let compiled = compile("//b[@x=\"3\"]").unwrap();
        let step = compiled
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                Op::Step(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert!(
            matches!(&step.predicates[0], Pred::AttrEq(name, value) if name == "x" && value == "3")
        );
    }

    #[test]
    fn test_union_chains_one_op_per_extra_branch() {
        let compiled = compile("//a | //b | //c").unwrap();
        let unions = compiled
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Union))
            .count();
        assert_eq!(unions, 2);
    }

    #[test]
    fn test_unknown_function_fails_at_compile() {
        let err = compile("//a[frobnicate(.)]").unwrap_err();
        assert!(matches!(err, Error::SelectorSyntax { .. }));
    }

    #[test]
    fn test_bad_syntax() {
        assert!(compile("//a[").is_err());
        assert!(compile("following::a").is_err());
    }
}
