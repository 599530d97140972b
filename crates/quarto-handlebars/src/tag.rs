/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag content parsing.
//!
//! Turns the text between `{{` and `}}` into a [`Tag`]: a block opener,
//! closer, `else`, or an inline [`Call`].
//!
//! # Argument grammar
//!
//! ```text
//! call   := value (ws arg)*
//! arg    := key '=' value | value
//! value  := string | '(' call ')' | word
//! string := '"' ... '"' | '\'' ... '\''
//! word   := number | true | false | null | undefined | path
//! ```
//!
//! Inside a string, a backslash before the same quote character or before
//! another backslash is an escape; any other backslash is kept as written.
//! The opposite quote character needs no escape. Parentheses inside strings
//! are literal text.

use crate::ast::{Call, Expr, PathExpr};
use crate::error::{TemplateError, TemplateResult};
use crate::value::TemplateValue;

/// How deeply blocks and subexpressions may nest within one template.
pub const MAX_NESTING: usize = 64;

/// A parsed tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// `{{#name args}}`
    Open(Call),
    /// `{{/name}}`
    Close(String),
    /// `{{else}}` or `{{^}}`
    Else,
    /// Any other tag.
    Inline(Call),
}

/// Parse the content of a tag.
pub fn parse_tag(content: &str) -> TemplateResult<Tag> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::parse("Empty tag"));
    }
    if trimmed == "else" || trimmed == "^" {
        return Ok(Tag::Else);
    }
    if let Some(rest) = trimmed.strip_prefix('#') {
        return parse_call(rest).map(Tag::Open);
    }
    if let Some(rest) = trimmed.strip_prefix('/') {
        let name = rest.trim();
        if name.is_empty() {
            return Err(TemplateError::parse("Closing tag without a name"));
        }
        return Ok(Tag::Close(name.to_string()));
    }
    parse_call(trimmed).map(Tag::Inline)
}

/// Parse a helper call (the tag content without any `#`).
pub fn parse_call(src: &str) -> TemplateResult<Call> {
    let mut scanner = ArgScanner::new(src);
    let call = scanner.call()?;
    scanner.skip_ws();
    if !scanner.at_end() {
        return Err(TemplateError::parse(format!(
            "Unexpected '{}' in tag",
            scanner.rest()
        )));
    }
    Ok(call)
}

struct ArgScanner<'a> {
    src: &'a str,
    pos: usize,
    /// Number of open parentheses around the current position.
    depth: usize,
}

impl<'a> ArgScanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Parse a call. Inside a subexpression the call ends at `)`, which is
    /// left for the caller to consume.
    fn call(&mut self) -> TemplateResult<Call> {
        self.skip_ws();
        match self.peek() {
            None if self.depth > 0 => {
                return Err(TemplateError::parse("Unbalanced parenthesis in subexpression"));
            }
            None => return Err(TemplateError::parse("Empty expression")),
            Some(')') if self.depth > 0 => {
                return Err(TemplateError::parse("Empty subexpression"));
            }
            Some(_) => {}
        }
        let head = self.value()?;
        let mut params = Vec::new();
        let mut hash = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(')') if self.depth > 0 => break,
                Some(')') => return Err(TemplateError::parse("Unexpected ')' in tag")),
                Some('=') => return Err(TemplateError::parse("Missing key before '='")),
                Some('"' | '\'' | '(') => params.push(self.value()?),
                Some(_) => {
                    let word = self.word();
                    if self.peek() == Some('=') {
                        self.pos += 1;
                        match self.peek() {
                            None => {
                                return Err(TemplateError::parse(format!(
                                    "Missing value for '{word}'"
                                )));
                            }
                            Some(c) if c.is_whitespace() => {
                                return Err(TemplateError::parse(format!(
                                    "Missing value for '{word}'"
                                )));
                            }
                            Some(_) => {}
                        }
                        let value = self.value()?;
                        hash.push((word.to_string(), value));
                    } else {
                        params.push(classify_word(word));
                    }
                }
            }
        }

        Ok(Call { head, params, hash })
    }

    fn value(&mut self) -> TemplateResult<Expr> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                let text = self.string(q)?;
                Ok(Expr::Literal(TemplateValue::String(text)))
            }
            Some('(') => self.subexpression(),
            Some(')') => Err(TemplateError::parse("Unexpected ')' in tag")),
            Some(_) => {
                let word = self.word();
                if word.is_empty() {
                    return Err(TemplateError::parse(format!(
                        "Unexpected '{}' in tag",
                        self.rest()
                    )));
                }
                Ok(classify_word(word))
            }
            None => Err(TemplateError::parse("Expected a value")),
        }
    }

    /// Read a bare word: up to whitespace, `=`, a quote or a parenthesis.
    fn word(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '(' | ')' | '"' | '\''))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Read a quoted string starting at the opening quote.
    fn string(&mut self, quote: char) -> TemplateResult<String> {
        let body = &self.rest()[quote.len_utf8()..];
        let mut out = String::new();
        let mut chars = body.char_indices();

        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some((_, next)) if next == quote || next == '\\' => out.push(next),
                    Some((_, next)) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                }
            } else if c == quote {
                self.pos += quote.len_utf8() + i + c.len_utf8();
                return Ok(out);
            } else {
                out.push(c);
            }
        }

        Err(TemplateError::parse("Unterminated string literal"))
    }

    /// Read `( call )` starting at the opening parenthesis.
    fn subexpression(&mut self) -> TemplateResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(TemplateError::NestingTooDeep {
                max_depth: MAX_NESTING,
            });
        }
        self.pos += 1;
        self.depth += 1;
        let call = self.call()?;
        self.skip_ws();
        if self.peek() != Some(')') {
            return Err(TemplateError::parse("Unbalanced parenthesis in subexpression"));
        }
        self.pos += 1;
        self.depth -= 1;
        Ok(Expr::SubExpr(Box::new(call)))
    }
}

fn classify_word(word: &str) -> Expr {
    match word {
        "true" => Expr::Literal(TemplateValue::Bool(true)),
        "false" => Expr::Literal(TemplateValue::Bool(false)),
        "null" | "undefined" => Expr::Literal(TemplateValue::Null),
        _ if is_number(word) => word
            .parse::<f64>()
            .map_or_else(|_| Expr::Path(PathExpr::new(word)), |n| {
                Expr::Literal(TemplateValue::Number(n))
            }),
        _ => Expr::Path(PathExpr::new(word)),
    }
}

fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let mut parts = digits.splitn(2, '.');
    let int = parts.next().unwrap_or_default();
    let frac = parts.next();
    !int.is_empty()
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}
