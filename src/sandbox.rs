/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/sandbox.rs
 * Responsibility: Working-directory confinement for every tool path.
 */

use crate::error::ToolError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// The single trust boundary for filesystem access. Every tool operation
/// resolves its path arguments through here before touching the filesystem
/// or the process table.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Pins the working directory for the lifetime of the run. The root is
    /// canonicalized once so later prefix checks compare real paths.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = fs::canonicalize(root.as_ref())
            .with_context(|| format!("Failed to resolve working directory {:?}", root.as_ref()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `relative` under the root and verifies the result stays inside
    /// it. Rejects absolute paths and any `..` traversal that would climb
    /// above the root. For targets that exist (or whose nearest existing
    /// ancestor exists), the canonical form is checked as well, so a symlink
    /// pointing outside the sandbox is rejected even when the lexical join
    /// looks safe.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ToolError> {
        let outside = || ToolError::OutsideSandbox(relative.to_string());
        let requested = Path::new(relative);
        if requested.is_absolute() {
            return Err(outside());
        }

        let mut resolved = self.root.clone();
        for component in requested.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    resolved.pop();
                    if !resolved.starts_with(&self.root) {
                        return Err(outside());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }

        let canonical = self.canonicalize_nearest(&resolved);
        if !canonical.starts_with(&self.root) {
            return Err(outside());
        }

        Ok(resolved)
    }

    /// Canonicalizes `path`, falling back to its nearest existing ancestor
    /// for targets that have not been created yet. The root itself always
    /// exists, so the walk terminates.
    fn canonicalize_nearest(&self, path: &Path) -> PathBuf {
        let mut probe = path.to_path_buf();
        loop {
            match fs::canonicalize(&probe) {
                Ok(canonical) => return canonical,
                Err(_) => match probe.parent() {
                    Some(parent) => probe = parent.to_path_buf(),
                    None => return probe,
                },
            }
        }
    }
}
