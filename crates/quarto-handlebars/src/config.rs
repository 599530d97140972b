/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.
//!
//! Loaded from YAML. Every field has a default, so an empty document (or no
//! document at all) yields a working engine.
//!
//! ```yaml
//! app:
//!   name: Docs
//!   version: 2.1.0
//!   settings:
//!     theme: dark
//! max-depth: 50
//! max-component-depth: 16
//! default-locale: en
//! assets:
//!   root: ./site
//!   default-extension: html
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid engine configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Application metadata exposed to templates as `app`.
    pub app: AppConfig,

    /// Ceiling for nested expansion depth.
    pub max_depth: usize,

    /// Ceiling for the component call stack.
    pub max_component_depth: usize,

    /// Locale used for `i18n.locale` when the request has none.
    pub default_locale: String,

    pub assets: AssetsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            max_depth: 50,
            max_component_depth: 16,
            default_locale: "en".to_string(),
            assets: AssetsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Application metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,

    /// Free-form values available to templates as `app.settings`.
    pub settings: IndexMap<String, serde_json::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: IndexMap::new(),
        }
    }
}

/// Where assets are loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AssetsConfig {
    /// Asset root directory. `None` disables filesystem assets.
    pub root: Option<PathBuf>,

    /// Extension appended to asset paths written without one.
    pub default_extension: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: None,
            default_extension: "html".to_string(),
        }
    }
}
