/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Asset resolution.
//!
//! Component libraries and `file.include` fragments are loaded by path
//! through an [`AssetResolver`]. Paths are always relative to the
//! resolver's notion of an asset root.

use crate::error::{TemplateError, TemplateResult};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Trait for locating and loading template assets.
pub trait AssetResolver {
    /// Map an asset path to a location, or `None` if no such asset exists.
    fn resolve_asset(&self, path: &str) -> Option<PathBuf>;

    /// Load the asset's text.
    ///
    /// Returns [`TemplateError::AssetNotFound`] when the asset cannot be
    /// resolved.
    fn load_asset(&self, path: &str) -> TemplateResult<String>;
}

/// Resolver that loads assets from a directory on disk.
///
/// - Absolute paths and paths containing `..` are rejected
/// - A path with no extension gets `default_extension`
/// - One trailing newline is removed from the loaded text
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    root: PathBuf,
    default_extension: String,
}

impl FileSystemResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_extension: "html".to_string(),
        }
    }

    /// Set the extension used for paths written without one.
    pub fn with_default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root, or `None` if it would escape it.
    pub fn asset_path(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return None;
        }

        let mut full = self.root.join(relative);
        if relative.extension().is_none() && !self.default_extension.is_empty() {
            full.set_extension(&self.default_extension);
        }
        Some(full)
    }
}

impl AssetResolver for FileSystemResolver {
    fn resolve_asset(&self, path: &str) -> Option<PathBuf> {
        self.asset_path(path).filter(|full| full.is_file())
    }

    fn load_asset(&self, path: &str) -> TemplateResult<String> {
        let full = self
            .resolve_asset(path)
            .ok_or_else(|| TemplateError::AssetNotFound {
                path: path.to_string(),
            })?;
        let content = std::fs::read_to_string(full)?;
        Ok(remove_final_newline(&content).to_string())
    }
}

/// Resolver that loads assets from an in-memory map.
///
/// Useful for testing and for assets bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    assets: HashMap<String, String>,
}

impl MemoryResolver {
    /// Create a new empty memory resolver.
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    /// Add an asset under the exact path templates will use.
    pub fn add(&mut self, path: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.assets.insert(path.into(), content.into());
        self
    }

    /// Create a resolver with the given assets.
    pub fn with_assets(
        assets: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut resolver = Self::new();
        for (path, content) in assets {
            resolver.add(path, content);
        }
        resolver
    }
}

impl AssetResolver for MemoryResolver {
    fn resolve_asset(&self, path: &str) -> Option<PathBuf> {
        self.assets.contains_key(path).then(|| PathBuf::from(path))
    }

    fn load_asset(&self, path: &str) -> TemplateResult<String> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| TemplateError::AssetNotFound {
                path: path.to_string(),
            })
    }
}

/// Resolver that finds nothing.
#[derive(Debug, Clone, Default)]
pub struct NullResolver;

impl AssetResolver for NullResolver {
    fn resolve_asset(&self, _path: &str) -> Option<PathBuf> {
        None
    }

    fn load_asset(&self, path: &str) -> TemplateResult<String> {
        Err(TemplateError::AssetNotFound {
            path: path.to_string(),
        })
    }
}

/// Remove the final newline from asset content.
///
/// This prevents extra blank lines when composing templates with includes.
pub fn remove_final_newline(content: &str) -> &str {
    content.strip_suffix('\n').unwrap_or(content)
}
