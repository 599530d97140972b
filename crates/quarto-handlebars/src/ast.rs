/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! The parser produces a tree of [`TemplateNode`]s which the evaluator walks.
//! Malformed tags are kept in the tree as [`Invalid`] nodes so that rendering
//! can continue around them.

use crate::tokenizer::Span;
use crate::value::TemplateValue;

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Literal(Literal),

    /// Inline tag: `{{path}}` or `{{helper arg key=value}}`
    Expression(Expression),

    /// Block helper: `{{#helper args}}...{{else}}...{{/helper}}`
    Block(Block),

    /// Comment (not rendered): `{{!-- comment --}}`
    Comment(Comment),

    /// A tag that could not be parsed; renders as an inline error marker.
    Invalid(Invalid),
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub text: String,
    pub span: Span,
}

/// Inline tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub call: Call,
    pub span: Span,
}

/// Block helper with its body and optional else branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The opening tag's call (`#` stripped).
    pub call: Call,
    /// Nodes between the opening tag and `{{else}}` / the closing tag.
    pub body: Vec<TemplateNode>,
    /// Nodes between `{{else}}` and the closing tag.
    pub else_body: Option<Vec<TemplateNode>>,
    /// Raw source of `body`, kept for component definitions.
    pub body_source: String,
    /// Span from the opening tag through the closing tag.
    pub span: Span,
}

/// Comment (not rendered).
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

/// Unparseable tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalid {
    pub message: String,
    pub span: Span,
}

/// A helper call or variable reference: head expression plus arguments.
///
/// `{{user.name}}` is a call with a path head and no arguments; whether it is
/// a variable lookup or a zero-argument helper is decided at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub head: Expr,
    pub params: Vec<Expr>,
    pub hash: Vec<(String, Expr)>,
}

impl Call {
    /// The helper name, when the head is a path.
    pub fn name(&self) -> Option<&str> {
        match &self.head {
            Expr::Path(path) => Some(&path.raw),
            _ => None,
        }
    }

    /// True when the call has no arguments at all.
    pub fn is_bare(&self) -> bool {
        self.params.is_empty() && self.hash.is_empty()
    }
}

/// An argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted path, `this`, or `@data` reference.
    Path(PathExpr),
    /// String, number, boolean or null literal.
    Literal(TemplateValue),
    /// Parenthesized subexpression: `(helper arg ...)`
    SubExpr(Box<Call>),
}

/// A dotted path as written in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub raw: String,
}

impl PathExpr {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_name_and_bareness() {
        let call = Call {
            head: Expr::Path(PathExpr::new("user.name")),
            params: vec![],
            hash: vec![],
        };
        assert_eq!(call.name(), Some("user.name"));
        assert!(call.is_bare());

        let literal = Call {
            head: Expr::Literal(TemplateValue::from("x")),
            params: vec![Expr::Literal(TemplateValue::Bool(true))],
            hash: vec![],
        };
        assert_eq!(literal.name(), None);
        assert!(!literal.is_bare());
    }
}
