// SPDX-License-Identifier: Apache-2.0

//! Integer evaluation of width bound expressions.
//!
//! Bounds are written in the arithmetic subset of VHDL found in port
//! declarations: integer literals, identifiers naming generics, parentheses
//! and the operators `+ - * / ** mod rem`. Evaluation fails (returns `None`)
//! as soon as an identifier is left in the expression.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::{Captures, Regex};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());

const OPERATOR_WORDS: [&str; 2] = ["mod", "rem"];

fn is_operator_word(word: &str) -> bool {
    OPERATOR_WORDS.iter().any(|op| op.eq_ignore_ascii_case(word))
}

/// Removes all whitespace except around word operators, which are kept
/// separated by single spaces.
pub(crate) fn normalize(expr: &str) -> String {
    expr.split_whitespace()
        .map(|part| {
            if is_operator_word(part) {
                format!(" {} ", part.to_ascii_lowercase())
            } else {
                part.to_string()
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Names referenced by an expression, in order of first appearance.
pub fn identifiers(expr: &str) -> Vec<String> {
    IDENTIFIER
        .find_iter(expr)
        .map(|m| m.as_str())
        .filter(|word| !is_operator_word(word))
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Replaces every identifier for which `lookup` returns a value. Values that
/// are not a plain literal or name are parenthesized to preserve precedence.
pub(crate) fn substitute(expr: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let replaced = IDENTIFIER.replace_all(expr, |caps: &Captures| {
        let word = &caps[0];
        if is_operator_word(word) {
            return word.to_string();
        }
        match lookup(word) {
            Some(value) => {
                let value = normalize(&value);
                let plain = !value.is_empty()
                    && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if plain {
                    value
                } else {
                    format!("({value})")
                }
            }
            None => word.to_string(),
        }
    });
    normalize(&replaced)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Int(i64),
    Ident,
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    Mod,
    Rem,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '0'..='9' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                    i += 1;
                }
                let digits = expr[start..i].replace('_', "");
                tokens.push(Token::Int(digits.parse().ok()?));
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &expr[start..i];
                tokens.push(match word.to_ascii_lowercase().as_str() {
                    "mod" => Token::Mod,
                    "rem" => Token::Rem,
                    _ => Token::Ident,
                });
            }
            '*' if bytes.get(i + 1) == Some(&b'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // sum := product (('+' | '-') product)*
    fn sum(&mut self) -> Option<i64> {
        let mut acc = self.product()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    acc = acc.checked_add(self.product()?)?;
                }
                Token::Minus => {
                    self.pos += 1;
                    acc = acc.checked_sub(self.product()?)?;
                }
                _ => break,
            }
        }
        Some(acc)
    }

    // product := power (('*' | '/' | mod | rem) power)*
    fn product(&mut self) -> Option<i64> {
        let mut acc = self.power()?;
        while let Some(op) = self.peek().cloned() {
            let op = match op {
                Token::Star | Token::Slash | Token::Mod | Token::Rem => op,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.power()?;
            acc = match op {
                Token::Star => acc.checked_mul(rhs)?,
                Token::Slash => acc.checked_div(rhs)?,
                Token::Mod => acc.checked_rem_euclid(rhs)?,
                _ => acc.checked_rem(rhs)?,
            };
        }
        Some(acc)
    }

    // power := unary ('**' power)?
    fn power(&mut self) -> Option<i64> {
        let base = self.unary()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exp = self.power()?;
            return base.checked_pow(u32::try_from(exp).ok()?);
        }
        Some(base)
    }

    fn unary(&mut self) -> Option<i64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary()?.checked_neg()
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<i64> {
        match self.next()? {
            Token::Int(n) => Some(n),
            Token::LParen => {
                let value = self.sum()?;
                match self.next()? {
                    Token::RParen => Some(value),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Evaluates an expression to an integer. Returns `None` if the expression
/// still references an identifier, is malformed, or overflows.
pub fn evaluate(expr: &str) -> Option<i64> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() || tokens.contains(&Token::Ident) {
        return None;
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.sum()?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(value)
}

/// Whether `expr` is syntactically valid, identifiers allowed.
pub(crate) fn is_well_formed(expr: &str) -> bool {
    // Identifiers are replaced by a literal so the structure can be checked.
    let sample = IDENTIFIER.replace_all(expr, |caps: &Captures| {
        if is_operator_word(&caps[0]) {
            caps[0].to_string()
        } else {
            "1".to_string()
        }
    });
    let Some(tokens) = tokenize(&sample) else {
        return false;
    };
    if tokens.is_empty() {
        return false;
    }
    // Evaluation may still fail on division by zero with the sample values,
    // so only the parse itself is checked.
    let mut parser = Parser { tokens, pos: 0 };
    let parsed = parser.sum_structure();
    parsed && parser.pos == parser.tokens.len()
}

impl Parser {
    fn sum_structure(&mut self) -> bool {
        if !self.operand_structure() {
            return false;
        }
        while let Some(op) = self.peek() {
            match op {
                Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Pow
                | Token::Mod
                | Token::Rem => {
                    self.pos += 1;
                    if !self.operand_structure() {
                        return false;
                    }
                }
                _ => break,
            }
        }
        true
    }

    fn operand_structure(&mut self) -> bool {
        match self.next() {
            Some(Token::Int(_)) => true,
            Some(Token::Minus) | Some(Token::Plus) => self.operand_structure(),
            Some(Token::LParen) => self.sum_structure() && self.next() == Some(Token::RParen),
            _ => false,
        }
    }
}

/// Solves `expr == target` for the single identifier `name`, assuming `expr`
/// is linear in it. The solution is verified by substitution.
pub(crate) fn solve_linear(expr: &str, name: &str, target: i64) -> Option<i64> {
    let at = |x: i64| evaluate(&substitute(expr, |id| (id == name).then(|| x.to_string())));
    let f0 = at(0)?;
    let slope = at(1)?.checked_sub(f0)?;
    let offset = target.checked_sub(f0)?;
    if slope == 0 || offset.checked_rem(slope)? != 0 {
        return None;
    }
    let x = offset.checked_div(slope)?;
    (at(x)? == target).then_some(x)
}
