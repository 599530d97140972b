/*
 * tokenizer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tokenizer.
//!
//! Splits template text into literal spans and `{{...}}` tags. The scan is
//! lazy: [`Tokenizer`] is an iterator and only looks as far ahead as the
//! current tag.
//!
//! A tag ends at the first `}}` outside of a quoted string and outside of a
//! parenthesized subexpression, so `{{let x="}}"}}` is a single tag. When no
//! such `}}` exists (an unterminated quote, say) the first plain `}}` ends the
//! tag and the argument parser reports the problem.
//!
//! `{{!-- ... --}}` comments run to `--}}` and nothing inside them is scanned.
//! `\{{` produces a literal `{{`.

/// Byte range of a token in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token of template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text.
    Text { text: &'a str, span: Span },
    /// A tag; `content` is the text between the braces.
    Tag { content: &'a str, span: Span },
    /// A comment; `text` excludes the delimiters.
    Comment { text: &'a str, span: Span },
    /// `{{` with no closing delimiter. Runs to the end of the source.
    Unclosed { span: Span },
}

impl Token<'_> {
    pub fn span(&self) -> Span {
        match self {
            Token::Text { span, .. }
            | Token::Tag { span, .. }
            | Token::Comment { span, .. }
            | Token::Unclosed { span } => *span,
        }
    }
}

/// Lazy tokenizer over template source.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

/// Tokenize template source.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer { source, pos: 0 }
}

impl<'a> Tokenizer<'a> {
    fn text(&mut self, len: usize) -> Token<'a> {
        let span = Span::new(self.pos, self.pos + len);
        self.pos += len;
        Token::Text {
            text: &self.source[span.start..span.end],
            span,
        }
    }

    fn unclosed(&mut self, start: usize) -> Token<'a> {
        self.pos = self.source.len();
        Token::Unclosed {
            span: Span::new(start, self.source.len()),
        }
    }

    /// Read a tag or comment starting at `self.pos` (which is at `{{`).
    fn read_tag(&mut self) -> Token<'a> {
        let start = self.pos;
        let rest = &self.source[start..];

        if let Some(body) = rest.strip_prefix("{{!--") {
            return match body.find("--}}") {
                Some(end) => {
                    self.pos = start + 5 + end + 4;
                    Token::Comment {
                        text: &body[..end],
                        span: Span::new(start, self.pos),
                    }
                }
                None => self.unclosed(start),
            };
        }

        if let Some(body) = rest.strip_prefix("{{!") {
            return match body.find("}}") {
                Some(end) => {
                    self.pos = start + 3 + end + 2;
                    Token::Comment {
                        text: &body[..end],
                        span: Span::new(start, self.pos),
                    }
                }
                None => self.unclosed(start),
            };
        }

        let inner_start = start + 2;
        let inner = &self.source[inner_start..];
        let Some(end) = find_tag_end(inner).or_else(|| inner.find("}}")) else {
            return self.unclosed(start);
        };

        let mut content = &inner[..end];
        let mut close = inner_start + end + 2;
        // `{{{expr}}}`
        if let Some(unwrapped) = content.strip_prefix('{') {
            content = unwrapped;
            if self.source[close..].starts_with('}') {
                close += 1;
            }
        }

        self.pos = close;
        Token::Tag {
            content,
            span: Span::new(start, close),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.source.len() {
            return None;
        }

        let rest = &self.source[self.pos..];
        match rest.find("{{") {
            None => Some(self.text(rest.len())),
            Some(0) => Some(self.read_tag()),
            Some(offset) if rest.as_bytes()[offset - 1] == b'\\' => {
                if offset > 1 {
                    // Text up to the backslash; the escape is handled next call.
                    return Some(self.text(offset - 1));
                }
                // `\{{` at the cursor: emit `{{` and drop the backslash.
                let span = Span::new(self.pos, self.pos + 3);
                self.pos += 3;
                Some(Token::Text {
                    text: &rest[1..3],
                    span,
                })
            }
            Some(offset) => Some(self.text(offset)),
        }
    }
}

/// Find the `}}` that closes a tag, honoring quotes and parentheses.
///
/// `src` starts just after the opening `{{`. Returns the byte offset of the
/// closing `}}` within `src`.
pub fn find_tag_end(src: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b'}' if depth == 0 && bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}
