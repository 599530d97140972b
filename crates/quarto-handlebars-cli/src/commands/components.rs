/*
 * components.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `qhbs components`: load a component library and print what it defines.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quarto_handlebars::{RequestScope, StaticRequest, TemplateValue};

/// Arguments for the components command
#[derive(Debug)]
pub struct ComponentsArgs {
    pub asset: String,
    pub assets: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Execute the components command
pub fn execute(args: ComponentsArgs) -> Result<()> {
    let json = load_as_json(&args)?;
    println!("{json}");
    Ok(())
}

fn load_as_json(args: &ComponentsArgs) -> Result<String> {
    let engine = super::build_engine(args.config.as_deref(), args.assets.clone(), PathBuf::from("."))?;
    let request = StaticRequest::new();
    let mut scope = RequestScope::new(&request);
    let result = engine.load_components(&mut scope, &args.asset, &TemplateValue::Null);
    serde_json::to_string_pretty(&result).context("Failed to serialize component definitions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_definitions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lib.html"),
            r#"{{#component "badge" tone="info"}}<span>{{text}}</span>{{/component}}"#,
        )
        .unwrap();

        let json = load_as_json(&ComponentsArgs {
            asset: "lib".into(),
            assets: Some(dir.path().to_path_buf()),
            config: None,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(
            value["components"]["badge"]["defaults"]["tone"],
            serde_json::json!("info")
        );
        assert_eq!(
            value["components"]["badge"]["body"],
            serde_json::json!("<span>{{text}}</span>")
        );
    }

    #[test]
    fn test_missing_library_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let json = load_as_json(&ComponentsArgs {
            asset: "missing".into(),
            assets: Some(dir.path().to_path_buf()),
            config: None,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert_eq!(value["error"], serde_json::json!("File not found: missing"));
    }
}
