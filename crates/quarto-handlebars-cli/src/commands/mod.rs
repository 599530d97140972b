/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command implementations for qhbs

pub mod components;
pub mod render;

use anyhow::{Context, Result};
use quarto_handlebars::{EngineConfig, HandlebarEngine, TemplateValue};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build an engine from an optional config file, with `assets` (when given)
/// overriding the configured asset root and `fallback_root` used when
/// neither is set.
pub fn build_engine(
    config: Option<&Path>,
    assets: Option<PathBuf>,
    fallback_root: PathBuf,
) -> Result<HandlebarEngine> {
    let mut config = match config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(root) = assets {
        config.assets.root = Some(root);
    }
    if config.assets.root.is_none() {
        config.assets.root = Some(fallback_root);
    }
    debug!(assets = ?config.assets.root, "engine configured");
    Ok(HandlebarEngine::new(config))
}

/// Read a JSON file into a template value.
pub fn read_json(path: &Path) -> Result<TemplateValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(TemplateValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assets_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("engine.yml");
        std::fs::write(&config_path, "assets:\n  root: /from/config\n").unwrap();

        let engine = build_engine(
            Some(&config_path),
            Some(PathBuf::from("/from/flag")),
            PathBuf::from("."),
        )
        .unwrap();
        assert_eq!(
            engine.config().assets.root,
            Some(PathBuf::from("/from/flag"))
        );

        let engine = build_engine(Some(&config_path), None, PathBuf::from(".")).unwrap();
        assert_eq!(
            engine.config().assets.root,
            Some(PathBuf::from("/from/config"))
        );
    }

    #[test]
    fn test_fallback_root() {
        let engine = build_engine(None, None, PathBuf::from("site")).unwrap();
        assert_eq!(engine.config().assets.root, Some(PathBuf::from("site")));
    }

    #[test]
    fn test_read_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"), "{err}");
    }
}
