//! XPath parser: token stream to expression tree.
//!
//! Binary operators go through one precedence-climbing loop driven by a
//! binding-power table. Location paths are kept flat: a start point plus
//! the ordered list of steps and filter predicates, which is also the
//! order the compiler emits them in.

use super::axes::Axis;
use super::lexer::{KindTest, Lexer, Token};
use crate::error::{Error, Grammar, Result};

/// An XPath expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A location path, possibly rooted in a sub-expression.
    Path(LocationPath),
    /// `a | b | c`, two or more branches.
    Union(Vec<Expr>),
    /// A binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Unary minus.
    Negate(Box<Expr>),
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Literal(String),
    /// Function call.
    Call(String, Vec<Expr>),
}

/// A location path: where it starts plus its steps and filter predicates
/// in source order.
#[derive(Debug, Clone)]
pub struct LocationPath {
    pub start: Start,
    pub ops: Vec<PathOp>,
}

/// Where a path starts.
#[derive(Debug, Clone)]
pub enum Start {
    /// Absolute: the document root.
    Root,
    /// Relative: the context node.
    Here,
    /// A parenthesized or call expression that must yield a node-set.
    Sub(Box<Expr>),
}

/// One link in a path: a location step, or a predicate filtering the
/// node-set accumulated so far (from `(expr)[pred]` filter expressions).
#[derive(Debug, Clone)]
pub enum PathOp {
    Step(Step),
    Predicate(Expr),
}

/// A location step. Its predicates are scoped to the step's own axis
/// list, unlike a `PathOp::Predicate`.
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// Node test in a location step.
#[derive(Debug, Clone)]
pub enum NodeTest {
    /// `*`: any element (any attribute, on the attribute axis).
    Wildcard,
    /// Unprefixed name.
    Named(String),
    /// `prefix:local`.
    Prefixed(String, String),
    /// `prefix:*`.
    PrefixWildcard(String),
    /// `node()`.
    AnyNode,
    /// `text()`.
    Text,
    /// `comment()`.
    Comment,
    /// `processing-instruction()`, optionally with a target.
    Pi(Option<String>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Binding power per binary operator token. Higher binds tighter.
fn binding(token: &Token) -> Option<(BinaryOp, u8)> {
    let entry = match token {
        Token::Or => (BinaryOp::Or, 1),
        Token::And => (BinaryOp::And, 2),
        Token::Eq => (BinaryOp::Eq, 3),
        Token::Ne => (BinaryOp::Ne, 3),
        Token::Lt => (BinaryOp::Lt, 4),
        Token::Le => (BinaryOp::Le, 4),
        Token::Gt => (BinaryOp::Gt, 4),
        Token::Ge => (BinaryOp::Ge, 4),
        Token::Plus => (BinaryOp::Add, 5),
        Token::Minus => (BinaryOp::Sub, 5),
        Token::Star => (BinaryOp::Mul, 6),
        Token::Div => (BinaryOp::Div, 6),
        Token::Mod => (BinaryOp::Mod, 6),
        _ => return None,
    };
    Some(entry)
}

fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        node_test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

/// Parse an XPath expression string.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, idx: 0 };
    let expr = parser.expression(0)?;
    if !matches!(parser.current(), Token::End) {
        return Err(parser.error(format!("unexpected trailing {:?}", parser.current())));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    idx: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.idx].0
    }

    fn pos(&self) -> usize {
        self.tokens[self.idx].1
    }

    fn advance(&mut self) {
        if self.idx + 1 < self.tokens.len() {
            self.idx += 1;
        }
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::SelectorSyntax {
            grammar: Grammar::Xpath,
            pos: self.pos(),
            msg: msg.into(),
        }
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<()> {
        if *self.current() == want {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, got {:?}", what, self.current())))
        }
    }

    /// Precedence-climbing loop over the binary operators.
    fn expression(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.operand()?;
        while let Some((op, bp)) = binding(self.current()) {
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.expression(bp + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// One operand: unary minus, then a union of paths.
    fn operand(&mut self) -> Result<Expr> {
        if matches!(self.current(), Token::Minus) {
            self.advance();
            return Ok(Expr::Negate(Box::new(self.operand()?)));
        }
        let first = self.path()?;
        if !matches!(self.current(), Token::Pipe) {
            return Ok(first);
        }
        let mut branches = vec![first];
        while matches!(self.current(), Token::Pipe) {
            self.advance();
            branches.push(self.path()?);
        }
        Ok(Expr::Union(branches))
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.current(),
            Token::Name(_)
                | Token::QName(..)
                | Token::PrefixStar(_)
                | Token::Star
                | Token::Axis(_)
                | Token::NodeType(_)
                | Token::At
                | Token::Dot
                | Token::DotDot
        )
    }

    /// A location path, or a plain primary when nothing path-like follows.
    fn path(&mut self) -> Result<Expr> {
        let (start, mut ops) = match self.current() {
            Token::Slash => {
                self.advance();
                if !self.starts_step() {
                    // Bare `/` selects the document root itself.
                    return Ok(Expr::Path(LocationPath {
                        start: Start::Root,
                        ops: Vec::new(),
                    }));
                }
                (Start::Root, vec![PathOp::Step(self.step()?)])
            }
            Token::DoubleSlash => {
                self.advance();
                let ops = vec![
                    PathOp::Step(descendant_or_self_step()),
                    PathOp::Step(self.step()?),
                ];
                (Start::Root, ops)
            }
            _ if self.starts_step() => (Start::Here, vec![PathOp::Step(self.step()?)]),
            _ => {
                let primary = self.primary()?;
                if !matches!(
                    self.current(),
                    Token::Slash | Token::DoubleSlash | Token::LBracket
                ) {
                    return Ok(primary);
                }
                (Start::Sub(Box::new(primary)), Vec::new())
            }
        };

        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    ops.push(PathOp::Step(self.step()?));
                }
                Token::DoubleSlash => {
                    self.advance();
                    ops.push(PathOp::Step(descendant_or_self_step()));
                    ops.push(PathOp::Step(self.step()?));
                }
                Token::LBracket => {
                    // Steps consume their own brackets, so one here filters
                    // the accumulated node-set of a sub-expression start.
                    self.advance();
                    let predicate = self.expression(0)?;
                    self.expect(Token::RBracket, "]")?;
                    ops.push(PathOp::Predicate(predicate));
                }
                _ => break,
            }
        }

        Ok(Expr::Path(LocationPath { start, ops }))
    }

    /// One location step, abbreviations included.
    fn step(&mut self) -> Result<Step> {
        let axis = match self.current() {
            Token::Dot => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Self_,
                    node_test: NodeTest::AnyNode,
                    predicates: self.predicates()?,
                });
            }
            Token::DotDot => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Parent,
                    node_test: NodeTest::AnyNode,
                    predicates: self.predicates()?,
                });
            }
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(axis) => {
                let axis = *axis;
                self.advance();
                axis
            }
            _ => Axis::Child,
        };
        let node_test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest> {
        match self.current().clone() {
            Token::Star => {
                self.advance();
                Ok(NodeTest::Wildcard)
            }
            Token::Name(name) => {
                self.advance();
                Ok(NodeTest::Named(name))
            }
            Token::QName(prefix, local) => {
                self.advance();
                Ok(NodeTest::Prefixed(prefix, local))
            }
            Token::PrefixStar(prefix) => {
                self.advance();
                Ok(NodeTest::PrefixWildcard(prefix))
            }
            Token::NodeType(kind) => {
                self.advance();
                self.expect(Token::LParen, "(")?;
                let target = if let Token::Literal(s) = self.current() {
                    let s = s.clone();
                    self.advance();
                    Some(s)
                } else {
                    None
                };
                if target.is_some() && kind != KindTest::Pi {
                    return Err(self.error("only processing-instruction() takes a target"));
                }
                self.expect(Token::RParen, ")")?;
                Ok(match kind {
                    KindTest::Node => NodeTest::AnyNode,
                    KindTest::Text => NodeTest::Text,
                    KindTest::Comment => NodeTest::Comment,
                    KindTest::Pi => NodeTest::Pi(target),
                })
            }
            other => Err(self.error(format!("expected a node test, got {:?}", other))),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>> {
        let mut predicates = Vec::new();
        while matches!(self.current(), Token::LBracket) {
            self.advance();
            predicates.push(self.expression(0)?);
            self.expect(Token::RBracket, "]")?;
        }
        Ok(predicates)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Literal(s) => {
                self.advance();
                Ok(Expr::Literal(s))
            }
            Token::LParen => {
                self.advance();
                let expr = self.expression(0)?;
                self.expect(Token::RParen, ")")?;
                Ok(expr)
            }
            Token::Function(name) => {
                self.advance();
                self.expect(Token::LParen, "(")?;
                let mut args = Vec::new();
                if !matches!(self.current(), Token::RParen) {
                    args.push(self.expression(0)?);
                    while matches!(self.current(), Token::Comma) {
                        self.advance();
                        args.push(self.expression(0)?);
                    }
                }
                self.expect(Token::RParen, ")")?;
                Ok(Expr::Call(name, args))
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(expr: Expr) -> LocationPath {
        match expr {
            Expr::Path(path) => path,
            other => panic!("expected a path, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_path_is_flat() {
        let path = path_of(parse("shelf/book").unwrap());
        assert!(matches!(path.start, Start::Here));
        assert_eq!(path.ops.len(), 2);
    }

    #[test]
    fn test_double_slash_expands() {
        let path = path_of(parse("//book").unwrap());
        assert!(matches!(path.start, Start::Root));
        assert_eq!(path.ops.len(), 2);
        match &path.ops[0] {
            PathOp::Step(step) => {
                assert_eq!(step.axis, Axis::DescendantOrSelf);
                assert!(matches!(step.node_test, NodeTest::AnyNode));
            }
            other => panic!("expected a step, got {:?}", other),
        }
    }

    #[test]
    fn test_step_keeps_its_own_predicates() {
        let path = path_of(parse("ul/li[2]").unwrap());
        assert_eq!(path.ops.len(), 2);
        let PathOp::Step(li) = &path.ops[1] else {
            panic!("expected a step");
        };
        assert_eq!(li.predicates.len(), 1);
    }

    #[test]
    fn test_filter_predicate_attaches_to_sub_expression() {
        let path = path_of(parse("(//a)[1]").unwrap());
        assert!(matches!(path.start, Start::Sub(_)));
        assert!(matches!(path.ops[..], [PathOp::Predicate(_)]));
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *rhs,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_div_is_both_element_and_operator() {
        assert!(matches!(parse("//div").unwrap(), Expr::Path(_)));
        assert!(matches!(
            parse("4 div 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Div,
                ..
            }
        ));
    }

    #[test]
    fn test_union_collects_all_branches() {
        let expr = parse("a | b | c").unwrap();
        let Expr::Union(branches) = expr else {
            panic!("expected a union");
        };
        assert_eq!(branches.len(), 3);
    }

    #[test]
    fn test_parent_abbreviation_is_a_step() {
        let path = path_of(parse("../img").unwrap());
        let PathOp::Step(first) = &path.ops[0] else {
            panic!("expected a step");
        };
        assert_eq!(first.axis, Axis::Parent);
    }

    #[test]
    fn test_function_call() {
        let expr = parse("count(//item)").unwrap();
        assert!(matches!(expr, Expr::Call(name, args) if name == "count" && args.len() == 1));
    }

    #[test]
    fn test_errors_carry_positions() {
        assert!(matches!(
            parse("//a[").unwrap_err(),
            Error::SelectorSyntax { .. }
        ));
        assert!(matches!(
            parse("count(1").unwrap_err(),
            Error::SelectorSyntax { .. }
        ));
        match parse("//a )").unwrap_err() {
            Error::SelectorSyntax { pos, .. } => assert_eq!(pos, 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_target_only_on_processing_instruction() {
        assert!(parse("//processing-instruction('xml')").is_ok());
        assert!(parse("//text('x')").is_err());
    }
}
