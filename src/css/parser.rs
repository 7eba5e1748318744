//! CSS selector parser.
//!
//! Maps the token stream onto the selector algebra: each compound becomes
//! one `Compound` (first type selector as the matcher, everything else as
//! co-requisite filters), combinator tokens link compounds rightward, and
//! the top-level comma list becomes a selector group.

use crate::css::lexer::{Lexer, Token};
use crate::error::{Error, Grammar, Result};
use crate::select::matchers::{AttrMatcher, Compound, Matcher, Pseudo};
use crate::select::nth::Nth;
use crate::select::{Combinator, Relation, Selector, SelectorGroup};

/// Parse a CSS selector group.
pub fn parse(input: &str) -> Result<SelectorGroup> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, idx: 0 };
    let group = parser.parse_group()?;
    for selector in &group {
        selector.validate()?;
    }
    Ok(group)
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

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Token::Whitespace) {
            self.advance();
        }
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::SelectorSyntax {
            grammar: Grammar::Css,
            pos: self.pos(),
            msg: msg.into(),
        }
    }

    fn parse_group(&mut self) -> Result<SelectorGroup> {
        let mut group: SelectorGroup = Vec::new();
        self.skip_whitespace();
        loop {
            group.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.current() {
                Token::Comma => {
                    self.advance();
                    self.skip_whitespace();
                }
                Token::Eof => break,
                other => return Err(self.error(format!("unexpected token {:?}", other))),
            }
        }
        Ok(group)
    }

    /// One complex selector: compounds joined by combinators, folded into
    /// a right-linked chain whose leftmost compound is the tree root.
    fn parse_complex(&mut self) -> Result<Box<dyn Selector>> {
        let mut compounds = vec![self.parse_compound()?];
        let mut relations: Vec<Relation> = Vec::new();

        loop {
            let saw_whitespace = matches!(self.current(), Token::Whitespace);
            if saw_whitespace {
                self.advance();
            }
            let relation = match self.current() {
                Token::Greater => {
                    self.advance();
                    self.skip_whitespace();
                    Relation::Children
                }
                Token::Plus => {
                    self.advance();
                    self.skip_whitespace();
                    Relation::NextSibling
                }
                Token::Tilde => {
                    self.advance();
                    self.skip_whitespace();
                    Relation::NextSiblings
                }
                Token::Comma | Token::Eof => break,
                _ if saw_whitespace => Relation::Descendants,
                other => return Err(self.error(format!("unexpected token {:?}", other))),
            };
            relations.push(relation);
            compounds.push(self.parse_compound()?);
        }

        let mut iter = compounds.into_iter().rev();
        let mut chain = iter.next().expect("at least one compound");
        for (mut compound, relation) in iter.zip(relations.into_iter().rev()) {
            compound.combinator = Some(Combinator::new(relation, Box::new(chain)));
            chain = compound;
        }
        Ok(Box::new(chain))
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let simples = self.parse_simples()?;
        Ok(assemble(simples))
    }

    /// The simple selectors of one compound. A type selector (`tag` or
    /// `*`) is only allowed in first position.
    fn parse_simples(&mut self) -> Result<Vec<Matcher>> {
        let mut simples: Vec<Matcher> = Vec::new();
        loop {
            match self.current().clone() {
                Token::Ident(name) => {
                    if !simples.is_empty() {
                        return Err(self.error("type selector must be first in a compound"));
                    }
                    self.advance();
                    simples.push(Matcher::Tag(name));
                }
                Token::Star => {
                    if !simples.is_empty() {
                        return Err(self.error("* must be first in a compound"));
                    }
                    self.advance();
                    simples.push(Matcher::AnyElement);
                }
                Token::Hash(value) => {
                    self.advance();
                    simples.push(Matcher::id(value));
                }
                Token::Class(value) => {
                    self.advance();
                    simples.push(Matcher::class(value));
                }
                Token::LeftBracket => {
                    simples.push(Matcher::Attr(self.parse_attr()?));
                }
                Token::Pseudo { name, args } => {
                    self.advance();
                    simples.push(pseudo_matcher(&name, args)?);
                }
                _ => break,
            }
        }
        if simples.is_empty() {
            return Err(self.error("expected a selector"));
        }
        Ok(simples)
    }

    fn parse_attr(&mut self) -> Result<AttrMatcher> {
        self.advance(); // [
        self.skip_whitespace();
        let name = match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                name
            }
            other => return Err(self.error(format!("expected attribute name, got {:?}", other))),
        };
        self.skip_whitespace();
        match self.current().clone() {
            Token::RightBracket => {
                self.advance();
                Ok(AttrMatcher::present(name))
            }
            Token::Match(op) => {
                self.advance();
                self.skip_whitespace();
                let value = match self.current().clone() {
                    Token::Ident(value) | Token::String(value) => {
                        self.advance();
                        value
                    }
                    other => {
                        return Err(self.error(format!("expected attribute value, got {:?}", other)))
                    }
                };
                self.skip_whitespace();
                if !matches!(self.current(), Token::RightBracket) {
                    return Err(self.error("expected ]"));
                }
                self.advance();
                Ok(AttrMatcher::new(name, op, value))
            }
            other => return Err(self.error(format!("expected ] or operator, got {:?}", other))),
        }
    }
}

/// First type selector becomes the compound's matcher, the rest become
/// co-requisite filters; without one, the implicit universal matcher
/// anchors the compound to elements.
fn assemble(simples: Vec<Matcher>) -> Compound {
    let mut iter = simples.into_iter();
    let first = iter.next().expect("parse_simples yields at least one");
    let (matcher, mut filters) = match first {
        Matcher::Tag(_) | Matcher::AnyElement => (first, Vec::new()),
        other => (
            Matcher::AnyElement,
            vec![Box::new(other) as Box<dyn Selector>],
        ),
    };
    filters.extend(iter.map(|m| Box::new(m) as Box<dyn Selector>));
    Compound {
        matcher,
        filters,
        combinator: None,
    }
}

fn pseudo_matcher(name: &str, args: Option<String>) -> Result<Matcher> {
    let no_args = |pseudo: Pseudo| {
        if args.is_some() {
            Err(Error::SelectorValidation(format!(
                ":{} does not accept arguments",
                name
            )))
        } else {
            Ok(Matcher::Pseudo(pseudo))
        }
    };
    let required = || {
        args.clone().ok_or_else(|| {
            Error::SelectorValidation(format!(":{} requires an argument", name))
        })
    };

    match name {
        "root" => no_args(Pseudo::Root),
        "first-child" => no_args(Pseudo::FirstChild),
        "last-child" => no_args(Pseudo::LastChild),
        "only-child" => no_args(Pseudo::OnlyChild),
        "first-of-type" => no_args(Pseudo::FirstOfType),
        "last-of-type" => no_args(Pseudo::LastOfType),
        "only-of-type" => no_args(Pseudo::OnlyOfType),
        "nth-child" => Ok(Matcher::Pseudo(Pseudo::NthChild(Nth::parse(&required()?)?))),
        "nth-last-child" => Ok(Matcher::Pseudo(Pseudo::NthLastChild(Nth::parse(
            &required()?,
        )?))),
        "nth-of-type" => Ok(Matcher::Pseudo(Pseudo::NthOfType(Nth::parse(
            &required()?,
        )?))),
        "nth-last-of-type" => Ok(Matcher::Pseudo(Pseudo::NthLastOfType(Nth::parse(
            &required()?,
        )?))),
        "not" => {
            let inner = required()?;
            let mut parser = Parser {
                tokens: Lexer::new(&inner).tokenize()?,
                idx: 0,
            };
            parser.skip_whitespace();
            let simples = parser.parse_simples()?;
            parser.skip_whitespace();
            if !matches!(parser.current(), Token::Eof) {
                return Err(Error::SelectorValidation(
                    ":not accepts only simple selectors".to_string(),
                ));
            }
            Ok(Matcher::Pseudo(Pseudo::Not(simples)))
        }
        "has" => {
            let inner = required()?;
            let mut parser = Parser {
                tokens: Lexer::new(&inner).tokenize()?,
                idx: 0,
            };
            parser.skip_whitespace();
            let relation = if matches!(parser.current(), Token::Greater) {
                parser.advance();
                parser.skip_whitespace();
                Relation::Children
            } else {
                Relation::Descendants
            };
            let chain = parser.parse_complex()?;
            parser.skip_whitespace();
            if !matches!(parser.current(), Token::Eof) {
                return Err(Error::SelectorValidation(
                    ":has accepts a single selector".to_string(),
                ));
            }
            Ok(Matcher::Pseudo(Pseudo::Has(relation, chain)))
        }
        _ => Err(Error::SelectorValidation(format!(
            "unknown pseudo-class :{}",
            name
        ))),
    }
}
