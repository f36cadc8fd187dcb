//! Path policy for the file tool.
//!
//! Paths must be absolute, may not climb with `..`, must stay clear of
//! forbidden prefixes (`~/.ssh`, `/etc`, ...) and, when allowed roots are
//! configured, must fall under one of them.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathValidationError {
    #[error("Path '{path}' is not absolute")]
    NotAbsolute { path: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' matches forbidden prefix '{prefix}'")]
    Forbidden { path: String, prefix: String },

    #[error("Path '{path}' is outside allowed roots")]
    OutsideAllowedRoots { path: String },
}

/// Allowed and forbidden path prefixes, with `~` already expanded.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    allowed_roots: Vec<PathBuf>,
    forbidden: Vec<(String, PathBuf)>,
}

impl PathPolicy {
    /// A policy that only enforces the absolute/no-traversal rules.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn new(allowed_roots: &[String], forbidden_paths: &[String]) -> Self {
        Self {
            allowed_roots: allowed_roots.iter().map(|r| expand_tilde(r)).collect(),
            forbidden: forbidden_paths
                .iter()
                .map(|p| (p.clone(), expand_tilde(p)))
                .collect(),
        }
    }

    /// Check `raw` against the policy and return the path to operate on.
    ///
    /// Symlinks are resolved for the longest existing ancestor so a link
    /// inside an allowed root cannot point at a forbidden location.
    pub fn check(&self, raw: &str) -> Result<PathBuf, PathValidationError> {
        let path = Path::new(raw);

        if !path.is_absolute() {
            return Err(PathValidationError::NotAbsolute { path: raw.into() });
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathValidationError::PathTraversal { path: raw.into() });
        }

        let resolved = resolve_existing_prefix(path);

        for (label, prefix) in &self.forbidden {
            if resolved.starts_with(prefix) || path.starts_with(prefix) {
                tracing::warn!(path = raw, prefix = %label, "File access denied");
                return Err(PathValidationError::Forbidden {
                    path: raw.into(),
                    prefix: label.clone(),
                });
            }
        }

        if !self.allowed_roots.is_empty()
            && !self
                .allowed_roots
                .iter()
                .any(|root| resolved.starts_with(root) || path.starts_with(root))
        {
            tracing::warn!(path = raw, "File access outside allowed roots");
            return Err(PathValidationError::OutsideAllowedRoots { path: raw.into() });
        }

        Ok(path.to_path_buf())
    }
}

/// Canonicalize the deepest ancestor that exists and re-attach the rest.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
