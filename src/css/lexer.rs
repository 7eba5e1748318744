//! CSS selector tokenizer.

use crate::error::{Error, Grammar, Result};
use crate::select::matchers::AttrOp;

/// CSS selector token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Element name or unquoted attribute value.
    Ident(String),
    /// `#id`
    Hash(String),
    /// `.class`
    Class(String),
    /// `:name` or `:name(args)`, args raw and balanced.
    Pseudo { name: String, args: Option<String> },
    /// Quoted string.
    String(String),
    /// `*`
    Star,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// Attribute comparison operator inside brackets.
    Match(AttrOp),
    /// `>`
    Greater,
    /// `+`
    Plus,
    /// `~` (as a combinator; `~=` lexes as `Match`)
    Tilde,
    /// `,`
    Comma,
    /// A run of whitespace (significant as the descendant combinator).
    Whitespace,
    /// End of input.
    Eof,
}

/// CSS selector lexer.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::SelectorSyntax {
            grammar: Grammar::Css,
            pos: self.pos,
            msg: msg.into(),
        }
    }

    /// Next token plus its byte position.
    pub fn next_token(&mut self) -> Result<(Token, usize)> {
        let start = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok((Token::Eof, start)),
        };

        let token = match c {
            c if c.is_whitespace() => {
                while self.peek().is_some_and(|c| c.is_whitespace()) {
                    self.advance(1);
                }
                Token::Whitespace
            }
            '*' => {
                self.advance(1);
                // *= is the substring operator
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::Match(AttrOp::Substring)
                } else {
                    Token::Star
                }
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            '>' => {
                self.advance(1);
                Token::Greater
            }
            '+' => {
                self.advance(1);
                Token::Plus
            }
            '~' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::Match(AttrOp::Includes)
                } else {
                    Token::Tilde
                }
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            '=' => {
                self.advance(1);
                Token::Match(AttrOp::Equals)
            }
            '|' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::Match(AttrOp::DashMatch)
                } else {
                    return Err(self.error("expected = after |"));
                }
            }
            '^' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::Match(AttrOp::Prefix)
                } else {
                    return Err(self.error("expected = after ^"));
                }
            }
            '$' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::Match(AttrOp::Suffix)
                } else {
                    return Err(self.error("expected = after $"));
                }
            }
            '#' => {
                self.advance(1);
                let name = self.read_ident()?;
                Token::Hash(name)
            }
            '.' => {
                self.advance(1);
                let name = self.read_ident()?;
                Token::Class(name)
            }
            ':' => {
                self.advance(1);
                let name = self.read_ident()?;
                let args = if self.peek() == Some('(') {
                    Some(self.read_balanced_args()?)
                } else {
                    None
                };
                Token::Pseudo { name, args }
            }
            '"' | '\'' => {
                let value = self.read_string(c)?;
                Token::String(value)
            }
            c if is_ident_char(c) => {
                let name = self.read_ident()?;
                Token::Ident(name)
            }
            other => return Err(self.error(format!("unexpected character {:?}", other))),
        };
        Ok((token, start))
    }

    fn read_ident(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        self.advance(1);
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.input[start..self.pos].to_string();
                self.advance(1);
                return Ok(value);
            }
            self.advance(c.len_utf8());
        }
        Err(self.error("unterminated string"))
    }

    /// Read `( ... )` with balanced nesting, returning the raw interior.
    fn read_balanced_args(&mut self) -> Result<String> {
        self.advance(1); // consume (
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let args = self.input[start..self.pos].to_string();
                        self.advance(1);
                        return Ok(args);
                    }
                }
                _ => {}
            }
            self.advance(c.len_utf8());
        }
        Err(self.error("unterminated pseudo-class arguments"))
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            let (token, pos) = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push((token, pos));
            if eof {
                break;
            }
        }
        Ok(tokens)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_simple_compound() {
        assert_eq!(
            tokens("div.foo#bar"),
            vec![
                Token::Ident("div".to_string()),
                Token::Class("foo".to_string()),
                Token::Hash("bar".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_combinators_and_whitespace() {
        assert_eq!(
            tokens("a > b + c ~ d e"),
            vec![
                Token::Ident("a".to_string()),
                Token::Whitespace,
                Token::Greater,
                Token::Whitespace,
                Token::Ident("b".to_string()),
                Token::Whitespace,
                Token::Plus,
                Token::Whitespace,
                Token::Ident("c".to_string()),
                Token::Whitespace,
                Token::Tilde,
                Token::Whitespace,
                Token::Ident("d".to_string()),
                Token::Whitespace,
                Token::Ident("e".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_attribute_ops() {
        assert_eq!(
            tokens("[href^='https']"),
            vec![
                Token::LeftBracket,
                Token::Ident("href".to_string()),
                Token::Match(AttrOp::Prefix),
                Token::String("https".to_string()),
                Token::RightBracket,
                Token::Eof,
            ]
        );
        assert_eq!(
            tokens("[a~=b][c|=d][e$=f][g*=h]")[2],
            Token::Match(AttrOp::Includes)
        );
    }

    #[test]
    fn test_pseudo_with_args() {
        assert_eq!(
            tokens(":nth-child(2n+1)"),
            vec![
                Token::Pseudo {
                    name: "nth-child".to_string(),
                    args: Some("2n+1".to_string()),
                },
                Token::Eof,
            ]
        );
        assert_eq!(
            tokens(":not(:nth-child(2))"),
            vec![
                Token::Pseudo {
                    name: "not".to_string(),
                    args: Some(":nth-child(2)".to_string()),
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_error_carries_position() {
        let err = Lexer::new("div ^ p").tokenize().unwrap_err();
        match err {
            Error::SelectorSyntax { pos, .. } => assert_eq!(pos, 5),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
