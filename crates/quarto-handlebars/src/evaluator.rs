/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation.
//!
//! An [`Evaluator`] renders one parsed template in a single left-to-right
//! pass. Helpers return `TemplateResult`; this is the only place an `Err`
//! is turned into an inline error marker, so one failing tag never stops the
//! rest of the template from rendering.

use crate::ast::{Block, Call, Expr, TemplateNode};
use crate::components::{ComponentDefinition, is_valid_component_name, normalize_component_name};
use crate::context::TemplateContext;
use crate::engine::HandlebarEngine;
use crate::error::{TemplateError, TemplateResult};
use crate::helpers::{BuiltinHelper, Helper, HelperArgs};
use crate::path::{resolve, resolve_in_map};
use crate::scope::RequestScope;
use crate::value::{TemplateValue, ValueMap};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static INLINE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

const VARS: &str = "vars";

/// State for one expansion call.
pub(crate) struct Evaluator<'e, 's, 'r> {
    engine: &'e HandlebarEngine,
    scope: &'s mut RequestScope<'r>,
    depth: usize,
    /// Bindings made with `let` during this call.
    vars: ValueMap,
}

impl<'e, 's, 'r> Evaluator<'e, 's, 'r> {
    pub(crate) fn new(
        engine: &'e HandlebarEngine,
        scope: &'s mut RequestScope<'r>,
        depth: usize,
    ) -> Self {
        Self {
            engine,
            scope,
            depth,
            vars: ValueMap::new(),
        }
    }

    pub(crate) fn render(&mut self, nodes: &[TemplateNode], ctx: &Arc<TemplateContext>) -> String {
        let mut out = String::new();
        for node in nodes {
            self.render_node(node, ctx, &mut out);
        }
        out
    }

    fn render_node(&mut self, node: &TemplateNode, ctx: &Arc<TemplateContext>, out: &mut String) {
        match node {
            TemplateNode::Literal(literal) => out.push_str(&literal.text),
            TemplateNode::Comment(_) => {}
            TemplateNode::Invalid(invalid) => {
                let marker = self.scope.report_message(
                    invalid.message.clone(),
                    self.depth,
                    Some(invalid.span),
                );
                out.push_str(&marker);
            }
            TemplateNode::Expression(expr) => match self.eval_tag(&expr.call, ctx) {
                Ok(value) => out.push_str(&value.render()),
                Err(err) => out.push_str(&self.scope.report(&err, self.depth, Some(expr.span))),
            },
            TemplateNode::Block(block) => match self.render_block(block, ctx) {
                Ok(text) => out.push_str(&text),
                Err(err) => out.push_str(&self.scope.report(&err, self.depth, Some(block.span))),
            },
        }
    }

    /// Evaluate an inline tag.
    fn eval_tag(&mut self, call: &Call, ctx: &Arc<TemplateContext>) -> TemplateResult<TemplateValue> {
        match &call.head {
            Expr::Path(_) => self.eval_call(call, ctx),
            Expr::Literal(value) if call.is_bare() => Ok(value.clone()),
            Expr::SubExpr(inner) if call.is_bare() => self.eval_call(inner, ctx),
            _ => Err(TemplateError::parse("Expected a helper name")),
        }
    }

    fn eval_expr(&mut self, expr: &Expr, ctx: &Arc<TemplateContext>) -> TemplateResult<TemplateValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => Ok(self.lookup(&path.raw, ctx)),
            Expr::SubExpr(call) => self.eval_tag(call, ctx),
        }
    }

    fn eval_args(
        &mut self,
        call: &Call,
        ctx: &Arc<TemplateContext>,
    ) -> TemplateResult<(Vec<TemplateValue>, ValueMap)> {
        let mut params = Vec::with_capacity(call.params.len());
        for param in &call.params {
            params.push(self.eval_expr(param, ctx)?);
        }
        let mut hash = ValueMap::new();
        for (key, value) in &call.hash {
            let value = self.eval_expr(value, ctx)?;
            hash.insert(key.clone(), value);
        }
        Ok((params, hash))
    }

    /// Evaluate a call whose head is a path: a helper, a component, or a
    /// plain variable reference.
    fn eval_call(&mut self, call: &Call, ctx: &Arc<TemplateContext>) -> TemplateResult<TemplateValue> {
        let Some(name) = call.name() else {
            return self.eval_tag(call, ctx);
        };

        match self.engine.helpers().lookup(name) {
            Helper::Builtin(builtin) => self.eval_builtin(builtin, call, ctx),
            Helper::Component(component) => self.invoke_component(&component, call, ctx),
            Helper::Custom(helper) => {
                let (params, hash) = self.eval_args(call, ctx)?;
                helper(&HelperArgs {
                    params: &params,
                    hash: &hash,
                    request: self.scope.request(),
                })
            }
            Helper::Unknown if call.is_bare() => Ok(self.lookup(name, ctx)),
            Helper::Unknown => Err(TemplateError::UnknownHelper {
                name: name.to_string(),
            }),
        }
    }

    fn eval_builtin(
        &mut self,
        builtin: BuiltinHelper,
        call: &Call,
        ctx: &Arc<TemplateContext>,
    ) -> TemplateResult<TemplateValue> {
        match builtin {
            BuiltinHelper::Each | BuiltinHelper::With | BuiltinHelper::Component => Err(
                TemplateError::usage(builtin.name(), "must be used as a block"),
            ),
            BuiltinHelper::Logical(op) => {
                let (params, _) = self.eval_args(call, ctx)?;
                Ok(op
                    .evaluate(&params)
                    .map_or(TemplateValue::Null, TemplateValue::Bool))
            }
            BuiltinHelper::If | BuiltinHelper::Unless => {
                let (params, _) = self.eval_args(call, ctx)?;
                let cond = params
                    .first()
                    .ok_or_else(|| TemplateError::usage(builtin.name(), "requires a condition"))?;
                let take_first = cond.is_truthy() == (builtin == BuiltinHelper::If);
                let branch = if take_first { 1 } else { 2 };
                Ok(params.get(branch).cloned().unwrap_or_default())
            }
            BuiltinHelper::Date(date) => {
                let (params, hash) = self.eval_args(call, ctx)?;
                date.call(&HelperArgs {
                    params: &params,
                    hash: &hash,
                    request: self.scope.request(),
                })
            }
            BuiltinHelper::Let => {
                if call.hash.is_empty() {
                    return Err(TemplateError::usage(
                        "let",
                        "requires at least one key=value pair",
                    ));
                }
                let (_, hash) = self.eval_args(call, ctx)?;
                self.vars.extend(hash);
                Ok(TemplateValue::Null)
            }
            BuiltinHelper::FileInclude => self.include_file(call, ctx),
            BuiltinHelper::Translate => {
                let (params, _) = self.eval_args(call, ctx)?;
                let key = params
                    .first()
                    .ok_or_else(|| TemplateError::usage("t", "requires a translation key"))?;
                Ok(TemplateValue::from(self.scope.request().translate(&key.render())))
            }
        }
    }

    fn render_block(&mut self, block: &Block, ctx: &Arc<TemplateContext>) -> TemplateResult<String> {
        let Some(name) = block.call.name() else {
            return Err(TemplateError::parse("Block helper requires a name"));
        };

        let builtin = match self.engine.helpers().lookup(name) {
            Helper::Builtin(builtin) => builtin,
            Helper::Unknown => {
                return Err(TemplateError::UnknownHelper {
                    name: name.to_string(),
                });
            }
            Helper::Component(_) | Helper::Custom(_) => {
                return Err(TemplateError::usage(name, "cannot be used as a block"));
            }
        };

        match builtin {
            BuiltinHelper::Logical(op) => {
                let (params, _) = self.eval_args(&block.call, ctx)?;
                let take_body = op.evaluate(&params).unwrap_or(false);
                Ok(self.render_branch(take_body, block, ctx))
            }
            BuiltinHelper::If | BuiltinHelper::Unless => {
                let cond = self.first_param(builtin, block, ctx)?;
                let take_body = cond.is_truthy() == (builtin == BuiltinHelper::If);
                Ok(self.render_branch(take_body, block, ctx))
            }
            BuiltinHelper::Each => {
                let items = self.first_param(builtin, block, ctx)?;
                Ok(self.render_each(&items, block, ctx))
            }
            BuiltinHelper::With => {
                let value = self.first_param(builtin, block, ctx)?;
                if !value.is_truthy() {
                    return Ok(self.render_branch(false, block, ctx));
                }
                let mut frame = TemplateContext::layered_on(ctx);
                frame.extend_from_value(&value);
                frame.insert("this", value);
                Ok(self.render(&block.body, &Arc::new(frame)))
            }
            BuiltinHelper::Component => {
                if block.else_body.is_some() {
                    return Err(TemplateError::usage(
                        "component",
                        "does not take an {{else}} branch",
                    ));
                }
                self.define_component(block, ctx)?;
                Ok(String::new())
            }
            BuiltinHelper::Date(_)
            | BuiltinHelper::Let
            | BuiltinHelper::FileInclude
            | BuiltinHelper::Translate => Err(TemplateError::usage(
                builtin.name(),
                "cannot be used as a block",
            )),
        }
    }

    fn first_param(
        &mut self,
        builtin: BuiltinHelper,
        block: &Block,
        ctx: &Arc<TemplateContext>,
    ) -> TemplateResult<TemplateValue> {
        let (params, _) = self.eval_args(&block.call, ctx)?;
        params
            .into_iter()
            .next()
            .ok_or_else(|| TemplateError::usage(builtin.name(), "requires an argument"))
    }

    fn render_branch(&mut self, take_body: bool, block: &Block, ctx: &Arc<TemplateContext>) -> String {
        if take_body {
            self.render(&block.body, ctx)
        } else {
            match &block.else_body {
                Some(nodes) => self.render(nodes, ctx),
                None => String::new(),
            }
        }
    }

    fn render_each(&mut self, items: &TemplateValue, block: &Block, ctx: &Arc<TemplateContext>) -> String {
        let mut out = String::new();
        match items {
            TemplateValue::List(list) if !list.is_empty() => {
                for (index, item) in list.iter().enumerate() {
                    let frame = iteration_frame(ctx, item, index, list.len(), None);
                    out.push_str(&self.render(&block.body, &frame));
                }
            }
            TemplateValue::Map(map) if !map.is_empty() => {
                for (index, (key, item)) in map.iter().enumerate() {
                    let frame = iteration_frame(ctx, item, index, map.len(), Some(key));
                    out.push_str(&self.render(&block.body, &frame));
                }
            }
            _ => out = self.render_branch(false, block, ctx),
        }
        out
    }

    /// Register a `{{#component "name" k=v}}` definition.
    fn define_component(&mut self, block: &Block, ctx: &Arc<TemplateContext>) -> TemplateResult<()> {
        let (params, hash) = self.eval_args(&block.call, ctx)?;
        let name = match params.first() {
            Some(TemplateValue::String(name)) => name.clone(),
            Some(other) => {
                return Err(TemplateError::InvalidComponentName {
                    name: other.render(),
                });
            }
            None => return Err(TemplateError::usage("component", "requires a component name")),
        };
        if !is_valid_component_name(&name) {
            return Err(TemplateError::InvalidComponentName { name });
        }

        let normalized = normalize_component_name(&name);
        let defaults: IndexMap<String, String> =
            hash.into_iter().map(|(k, v)| (k, v.render())).collect();
        debug!(component = %normalized, defaults = defaults.len(), "registered component");
        self.scope.components.define(ComponentDefinition {
            name: normalized,
            defaults,
            body: block.body_source.clone(),
        });
        Ok(())
    }

    /// Expand `{{components.name k=v}}`.
    fn invoke_component(
        &mut self,
        raw_name: &str,
        call: &Call,
        ctx: &Arc<TemplateContext>,
    ) -> TemplateResult<TemplateValue> {
        let name = normalize_component_name(raw_name);
        let Some(definition) = self.scope.components.get(&name).cloned() else {
            return Err(TemplateError::ComponentNotFound {
                name: raw_name.to_string(),
            });
        };

        let stack = &self.scope.call_stack;
        if stack.contains(&name) {
            return Err(TemplateError::CircularComponent {
                chain: stack.chain_with(&name),
            });
        }
        let max_depth = self.engine.config().max_component_depth;
        if stack.len() >= max_depth {
            return Err(TemplateError::ComponentDepthExceeded { name, max_depth });
        }

        let (_, hash) = self.eval_args(call, ctx)?;
        let mut params: ValueMap = definition
            .defaults
            .into_iter()
            .map(|(k, v)| (k, TemplateValue::String(v)))
            .collect();
        params.extend(hash);
        let inline = params
            .shift_remove("_inline")
            .is_some_and(|v| v == TemplateValue::Bool(true) || v.as_str() == Some("true"));

        self.scope.call_stack.push(name);
        let output = self.engine.expand_at_depth(
            self.scope,
            &definition.body,
            &TemplateValue::Map(params),
            self.depth + 1,
        );
        self.scope.call_stack.pop();

        let output = if inline {
            INLINE_WHITESPACE.replace_all(&output, " ").trim().to_string()
        } else {
            output
        };
        Ok(TemplateValue::String(output))
    }

    /// Expand `{{file.include "path" k=v}}`.
    fn include_file(&mut self, call: &Call, ctx: &Arc<TemplateContext>) -> TemplateResult<TemplateValue> {
        let (params, hash) = self.eval_args(call, ctx)?;
        let path = match params.first() {
            Some(path) if !path.render().is_empty() => path.render(),
            _ => return Err(TemplateError::usage("file.include", "requires a path")),
        };
        let source = self.engine.assets().load_asset(&path)?;
        let output = self.engine.expand_at_depth(
            self.scope,
            &source,
            &TemplateValue::Map(hash),
            self.depth + 1,
        );
        Ok(TemplateValue::String(output))
    }

    /// Resolve a variable path. `vars.*` checks `let` bindings first.
    fn lookup(&self, raw: &str, ctx: &TemplateContext) -> TemplateValue {
        if raw == VARS {
            return TemplateValue::Map(self.vars.clone());
        }
        if let Some(local) = raw
            .strip_prefix(VARS)
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|rest| resolve_in_map(&self.vars, rest))
        {
            return local.clone();
        }
        resolve(ctx, raw).cloned().unwrap_or_default()
    }
}

/// Child layer binding one `#each` item.
fn iteration_frame(
    ctx: &Arc<TemplateContext>,
    item: &TemplateValue,
    index: usize,
    len: usize,
    key: Option<&str>,
) -> Arc<TemplateContext> {
    let mut frame = TemplateContext::layered_on(ctx);
    frame.extend_from_value(item);
    frame.insert("this", item.clone());
    frame.insert("@index", TemplateValue::from(index));
    frame.insert("@first", TemplateValue::Bool(index == 0));
    frame.insert("@last", TemplateValue::Bool(index + 1 == len));
    if let Some(key) = key {
        frame.insert("@key", TemplateValue::from(key));
    }
    Arc::new(frame)
}
