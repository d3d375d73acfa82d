//! Recursive-descent parser for cell rule strings.
//!
//! ```text
//! union        := intersection (':' intersection)*
//! intersection := factor factor*
//! factor       := INT | '(' union ')' | '#' '(' union ')' | '#' UINT
//! ```
//!
//! Juxtaposition binds tighter than `:`.

use crate::config::MAX_NUMBER;
use crate::error::{Result, RuleError};

use super::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// Value and whether an explicit sign was written.
    Number(i64, bool),
    Colon,
    Open,
    Close,
    Hash,
}

fn error(offset: usize, message: impl Into<String>) -> RuleError {
    RuleError::Parse {
        offset,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<(usize, Token)>, RuleError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b':' => {
                tokens.push((i, Token::Colon));
                i += 1;
            }
            b'(' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            b')' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            b'#' => {
                tokens.push((i, Token::Hash));
                i += 1;
            }
            b'+' | b'-' | b'0'..=b'9' => {
                let start = i;
                if !c.is_ascii_digit() {
                    i += 1;
                }
                let digits = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if digits == i {
                    return Err(error(start, "sign without a surface number"));
                }
                let value: i64 = input[start..i]
                    .parse()
                    .map_err(|_| error(start, "surface number out of range"))?;
                tokens.push((start, Token::Number(value, digits != start)));
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(error(i, format!("unexpected character '{ch}'")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|&(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |&(o, _)| o)
    }

    fn expect_close(&mut self) -> std::result::Result<(), RuleError> {
        if self.peek() == Some(Token::Close) {
            self.pos += 1;
            Ok(())
        } else {
            Err(error(self.offset(), "expected ')'"))
        }
    }

    fn union(&mut self) -> std::result::Result<Rule, RuleError> {
        let mut rule = self.intersection()?;
        while self.peek() == Some(Token::Colon) {
            self.pos += 1;
            let rhs = self.intersection()?;
            rule = Rule::Union(Box::new(rule), Box::new(rhs));
        }
        Ok(rule)
    }

    fn intersection(&mut self) -> std::result::Result<Rule, RuleError> {
        let mut rule = self.factor()?;
        while matches!(self.peek(), Some(Token::Number(..) | Token::Open | Token::Hash)) {
            let rhs = self.factor()?;
            rule = Rule::Intersection(Box::new(rule), Box::new(rhs));
        }
        Ok(rule)
    }

    fn factor(&mut self) -> std::result::Result<Rule, RuleError> {
        let offset = self.offset();
        match self.peek() {
            Some(Token::Number(n, _)) => {
                self.pos += 1;
                if n == 0 {
                    return Err(error(offset, "surface number 0 is not allowed"));
                }
                if n.unsigned_abs() > u64::from(MAX_NUMBER) {
                    return Err(error(offset, "surface number out of range"));
                }
                let n = i32::try_from(n).map_err(|_| error(offset, "surface number out of range"))?;
                Ok(Rule::Literal(n))
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.union()?;
                self.expect_close()?;
                Ok(inner)
            }
            Some(Token::Hash) => {
                self.pos += 1;
                let offset = self.offset();
                match self.peek() {
                    Some(Token::Open) => {
                        self.pos += 1;
                        let inner = self.union()?;
                        self.expect_close()?;
                        Ok(Rule::Complement(Box::new(inner)))
                    }
                    Some(Token::Number(n, false)) if n > 0 => {
                        self.pos += 1;
                        let n = u32::try_from(n)
                            .ok()
                            .filter(|&n| n <= MAX_NUMBER)
                            .ok_or_else(|| error(offset, "cell number out of range"))?;
                        Ok(Rule::CellRef(n))
                    }
                    _ => Err(error(offset, "expected '(' or a cell number after '#'")),
                }
            }
            Some(Token::Colon) => Err(error(offset, "expected a surface before ':'")),
            Some(Token::Close) => Err(error(offset, "unmatched ')'")),
            None => Err(error(offset, "unexpected end of input")),
        }
    }
}

/// Parses a rule string.
pub(super) fn parse_rule(input: &str) -> Result<Rule> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(error(0, "empty rule").into());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let rule = parser.union()?;
    match parser.peek() {
        None => Ok(rule),
        Some(Token::Close) => Err(error(parser.offset(), "unmatched ')'").into()),
        Some(_) => Err(error(parser.offset(), "unexpected token").into()),
    }
}
