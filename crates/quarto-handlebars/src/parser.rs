/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! A recursive-descent pass over the [`Tokenizer`] output that pairs block
//! openers with their closers and builds the [`TemplateNode`] tree.
//! Parsing cannot fail: structural problems (unclosed or mismatched blocks,
//! stray `{{else}}`, unparseable tags) become [`Invalid`] nodes. A block
//! opened more than [`MAX_NESTING`] levels deep is skipped up to its closer
//! and replaced by a single [`Invalid`] node.

use crate::ast::{Block, Call, Comment, Expression, Invalid, Literal, TemplateNode};
use crate::error::TemplateError;
use crate::tag::{MAX_NESTING, Tag, parse_tag};
use crate::tokenizer::{Span, Token, Tokenizer, tokenize};

/// A parsed template ready for evaluation.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed template AST.
    pub(crate) nodes: Vec<TemplateNode>,

    /// Original source.
    pub(crate) source: String,
}

impl Template {
    /// Parse a template from source text.
    pub fn compile(source: &str) -> Self {
        let mut builder = TreeBuilder {
            source,
            tokens: tokenize(source),
            depth: 0,
        };
        let nodes = builder.parse_top_level();
        Template {
            nodes,
            source: source.to_string(),
        }
    }

    /// Get the AST nodes of this template.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Get the original source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Why a node sequence stopped.
enum Stop {
    Eof,
    Else(Span),
    Close(String, Span),
}

struct TreeBuilder<'a> {
    source: &'a str,
    tokens: Tokenizer<'a>,
    /// Blocks currently open.
    depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn parse_top_level(&mut self) -> Vec<TemplateNode> {
        let mut nodes = Vec::new();
        loop {
            let (mut section, stop) = self.parse_sequence();
            nodes.append(&mut section);
            match stop {
                Stop::Eof => return nodes,
                Stop::Else(span) => nodes.push(invalid(
                    "Unexpected {{else}} outside of a block".to_string(),
                    span,
                )),
                Stop::Close(name, span) => nodes.push(invalid(
                    format!("Unexpected closing tag {{{{/{name}}}}}"),
                    span,
                )),
            }
        }
    }

    /// Parse nodes until end of input, `{{else}}` or a closing tag. The
    /// caller decides whether the stop is legal where it occurred.
    fn parse_sequence(&mut self) -> (Vec<TemplateNode>, Stop) {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text { text, span } => nodes.push(TemplateNode::Literal(Literal {
                    text: text.to_string(),
                    span,
                })),
                Token::Comment { text, span } => nodes.push(TemplateNode::Comment(Comment {
                    text: text.to_string(),
                    span,
                })),
                Token::Unclosed { span } => nodes.push(invalid(
                    "Unclosed tag: missing '}}'".to_string(),
                    span,
                )),
                Token::Tag { content, span } => match parse_tag(content) {
                    Ok(Tag::Inline(call)) => {
                        nodes.push(TemplateNode::Expression(Expression { call, span }))
                    }
                    Ok(Tag::Open(_)) if self.depth >= MAX_NESTING => {
                        nodes.push(self.skip_block(span))
                    }
                    Ok(Tag::Open(call)) => nodes.push(self.parse_block(call, span)),
                    Ok(Tag::Else) => return (nodes, Stop::Else(span)),
                    Ok(Tag::Close(name)) => return (nodes, Stop::Close(name, span)),
                    Err(err) => nodes.push(invalid(err.to_string(), span)),
                },
            }
        }

        (nodes, Stop::Eof)
    }

    /// Parse a block body after its opening tag has been consumed.
    fn parse_block(&mut self, call: Call, open: Span) -> TemplateNode {
        let name = call.name().unwrap_or_default().to_string();
        self.depth += 1;

        let (body, mut stop) = self.parse_sequence();
        let body_end = match &stop {
            Stop::Else(span) | Stop::Close(_, span) => span.start,
            Stop::Eof => self.source.len(),
        };

        let mut else_body = None;
        if matches!(stop, Stop::Else(_)) {
            let mut nodes = Vec::new();
            loop {
                let (mut section, next) = self.parse_sequence();
                nodes.append(&mut section);
                match next {
                    Stop::Else(span) => nodes.push(invalid(
                        format!("Duplicate {{{{else}}}} in block {{{{#{name}}}}}"),
                        span,
                    )),
                    other => {
                        stop = other;
                        break;
                    }
                }
            }
            else_body = Some(nodes);
        }
        self.depth -= 1;

        match stop {
            Stop::Close(close_name, close) if close_name == name => TemplateNode::Block(Block {
                call,
                body,
                else_body,
                body_source: self.source[open.end..body_end].to_string(),
                span: Span::new(open.start, close.end),
            }),
            Stop::Close(close_name, close) => invalid(
                format!(
                    "Mismatched closing tag: expected {{{{/{name}}}}}, found {{{{/{close_name}}}}}"
                ),
                Span::new(open.start, close.end),
            ),
            Stop::Eof | Stop::Else(_) => invalid(
                format!("Unclosed block: missing {{{{/{name}}}}}"),
                Span::new(open.start, self.source.len()),
            ),
        }
    }

    /// Consume tokens up to the closer balancing an already-consumed opener.
    fn skip_block(&mut self, open: Span) -> TemplateNode {
        let message = TemplateError::NestingTooDeep {
            max_depth: MAX_NESTING,
        }
        .to_string();
        let mut open_blocks = 1usize;
        for token in self.tokens.by_ref() {
            let Token::Tag { content, span } = token else {
                continue;
            };
            match parse_tag(content) {
                Ok(Tag::Open(_)) => open_blocks += 1,
                Ok(Tag::Close(_)) => {
                    open_blocks -= 1;
                    if open_blocks == 0 {
                        return invalid(message, Span::new(open.start, span.end));
                    }
                }
                _ => {}
            }
        }
        invalid(message, Span::new(open.start, self.source.len()))
    }
}

fn invalid(message: String, span: Span) -> TemplateNode {
    TemplateNode::Invalid(Invalid { message, span })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Template {
        Template::compile(source)
    }

    fn invalid_messages(template: &Template) -> Vec<String> {
        template
            .nodes()
            .iter()
            .filter_map(|n| match n {
                TemplateNode::Invalid(inv) => Some(inv.message.clone()),
                _ => None,
            })
            .collect()
    }

    fn nested_ifs(levels: usize) -> String {
        format!("{}x{}", "{{#if a}}".repeat(levels), "{{/if}}".repeat(levels))
    }

    fn block_depth(nodes: &[TemplateNode]) -> usize {
        nodes
            .iter()
            .map(|n| match n {
                TemplateNode::Block(block) => 1 + block_depth(&block.body),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_block_nesting_at_limit() {
        let template = compile(&nested_ifs(MAX_NESTING));
        assert_eq!(block_depth(template.nodes()), MAX_NESTING);
        assert!(invalid_messages(&template).is_empty());
    }

    #[test]
    fn test_block_nesting_past_limit_is_skipped() {
        let template = compile(&format!("{}after", nested_ifs(1_000)));

        let mut nodes = template.nodes();
        for _ in 0..MAX_NESTING {
            let [TemplateNode::Block(block)] = nodes else {
                panic!("expected a single block, got {nodes:?}");
            };
            nodes = &block.body;
        }
        let [TemplateNode::Invalid(inner)] = nodes else {
            panic!("expected the overflow marker, got {nodes:?}");
        };
        assert_eq!(inner.message, "Maximum expression nesting depth (64) exceeded");
        assert!(matches!(
            template.nodes().last(),
            Some(TemplateNode::Literal(Literal { text, .. })) if text == "after"
        ));
    }

    #[test]
    fn test_literal_and_expression() {
        let template = compile("Hello, {{name}}!");
        assert_eq!(template.nodes().len(), 3);
        assert!(matches!(template.nodes()[1], TemplateNode::Expression(_)));
        assert_eq!(template.source(), "Hello, {{name}}!");
    }

    #[test]
    fn test_block_with_else() {
        let template = compile("{{#if a}}yes{{else}}no{{/if}}");
        let [TemplateNode::Block(block)] = template.nodes() else {
            panic!("expected a single block, got {:?}", template.nodes());
        };
        assert_eq!(block.call.name(), Some("if"));
        assert_eq!(block.body.len(), 1);
        assert_eq!(block.else_body.as_ref().map(Vec::len), Some(1));
        assert_eq!(block.body_source, "yes");
        assert_eq!(block.span, Span::new(0, 29));
    }

    #[test]
    fn test_nested_blocks_keep_body_source() {
        let template =
            compile(r#"{{#component "card"}}<b>{{#if x}}{{x}}{{/if}}</b>{{/component}}"#);
        let [TemplateNode::Block(block)] = template.nodes() else {
            panic!("expected a single block");
        };
        assert_eq!(block.body_source, "<b>{{#if x}}{{x}}{{/if}}</b>");
        assert!(
            block
                .body
                .iter()
                .any(|n| matches!(n, TemplateNode::Block(_)))
        );
    }

    #[test]
    fn test_unclosed_block() {
        let template = compile("{{#if a}}never closed");
        assert_eq!(
            invalid_messages(&template),
            vec!["Unclosed block: missing {{/if}}"]
        );
    }

    #[test]
    fn test_mismatched_close() {
        let template = compile("{{#if a}}x{{/each}}after");
        assert_eq!(
            invalid_messages(&template),
            vec!["Mismatched closing tag: expected {{/if}}, found {{/each}}"]
        );
        assert!(matches!(
            template.nodes().last(),
            Some(TemplateNode::Literal(Literal { text, .. })) if text == "after"
        ));
    }

    #[test]
    fn test_stray_close_and_else() {
        let template = compile("a{{/if}}b{{else}}c");
        assert_eq!(
            invalid_messages(&template),
            vec![
                "Unexpected closing tag {{/if}}",
                "Unexpected {{else}} outside of a block",
            ]
        );
        assert_eq!(template.nodes().len(), 5);
    }

    #[test]
    fn test_duplicate_else() {
        let template = compile("{{#if a}}1{{else}}2{{else}}3{{/if}}");
        let [TemplateNode::Block(block)] = template.nodes() else {
            panic!("expected a single block");
        };
        let else_body = block.else_body.as_ref().expect("else body");
        assert!(
            else_body
                .iter()
                .any(|n| matches!(n, TemplateNode::Invalid(_)))
        );
    }

    #[test]
    fn test_malformed_tag_becomes_invalid() {
        let template = compile(r#"x{{foo "bar}}y"#);
        assert_eq!(
            invalid_messages(&template),
            vec!["Parse error: Unterminated string literal"]
        );
    }

    #[test]
    fn test_comment_node() {
        let template = compile("{{!-- {{#if}} --}}");
        assert!(matches!(template.nodes(), [TemplateNode::Comment(_)]));
    }
}
