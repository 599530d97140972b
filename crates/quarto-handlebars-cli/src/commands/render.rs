/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! `qhbs render`: expand one template for a synthetic request.
//!
//! The expanded text goes to stdout. Every error marker that was emitted is
//! repeated on stderr so problems are visible without searching the output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use quarto_handlebars::{Diagnostic, RequestScope, StaticRequest, TemplateValue};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub template: PathBuf,
    pub context: Option<PathBuf>,
    pub user: Option<PathBuf>,
    pub assets: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Component libraries to load first
    pub components: Vec<String>,
    pub cookies: Vec<String>,
    pub headers: Vec<String>,
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub locale: Option<String>,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let template_dir = args
        .template
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let engine = super::build_engine(args.config.as_deref(), args.assets.clone(), template_dir)?;

    let source = std::fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let additional = match &args.context {
        Some(path) => super::read_json(path)?,
        None => TemplateValue::Null,
    };
    let request = build_request(&args)?;

    let mut scope = RequestScope::new(&request);
    for library in &args.components {
        let result = engine.load_components(&mut scope, library, &additional);
        if !result.success {
            bail!(
                "Failed to load components from {library}: {}",
                result.error.unwrap_or_default()
            );
        }
        debug!(library = %library, count = result.components.len(), "components loaded");
    }

    let output = engine.expand(&mut scope, &source, &additional);
    print!("{output}");

    let diagnostics = scope.diagnostics();
    if !diagnostics.is_empty() {
        info!(count = diagnostics.len(), "template rendered with errors");
        for diagnostic in diagnostics.diagnostics() {
            eprintln!("{}", describe(diagnostic));
        }
    }
    Ok(())
}

fn build_request(args: &RenderArgs) -> Result<StaticRequest> {
    let mut request = StaticRequest::new()
        .with_protocol(args.protocol.as_str())
        .with_hostname(args.host.as_str())
        .with_path(args.path.as_str());

    for raw in &args.cookies {
        let (name, value) = split_pair(raw, '=')?;
        request = request.with_cookie(name, value);
    }
    for raw in &args.headers {
        let (name, value) = split_pair(raw, ':')?;
        request = request.with_header(name, value);
    }
    if let Some(locale) = &args.locale {
        request = request.with_locale(locale.as_str());
    }
    if let Some(path) = &args.user {
        request = request.with_user(super::read_json(path)?);
    }
    Ok(request)
}

/// One stderr line for a diagnostic. Byte offsets refer to the template
/// expanded at that depth.
fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic.span {
        Some(span) => format!(
            "error (depth {}, bytes {}..{}): {}",
            diagnostic.depth, span.start, span.end, diagnostic.message
        ),
        None => format!("error (depth {}): {}", diagnostic.depth, diagnostic.message),
    }
}

/// Split `NAME<sep>VALUE`, trimming both sides.
fn split_pair(raw: &str, sep: char) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(sep)
        .ok_or_else(|| anyhow!("Expected NAME{sep}VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing name in '{raw}'");
    }
    Ok((name.to_string(), value.trim().to_string()))
}
