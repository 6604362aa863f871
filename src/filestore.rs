//! File-store collaborators used by the approval gate after a command is
//! approved.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use approval_gate::FileStore;

/// File names the store refuses to overwrite even after approval.
const SENSITIVE_SUFFIXES: &[&str] = &[
    ".env",
    "firebase-auth.js",
    "secrets.py",
    "config.js",
    "keys.json",
];

fn sensitive_path_error(path: &str) -> Option<String> {
    SENSITIVE_SUFFIXES
        .iter()
        .find(|suffix| path.ends_with(*suffix))
        .map(|_| format!("Blocked write to sensitive path {path}"))
}

/// Disk-backed store confined to one workspace root.
///
/// Relative paths resolve under the root; any path whose resolved location
/// escapes the root is rejected.
#[derive(Debug, Clone)]
pub struct WorkspaceFileStore {
    workspace_root: PathBuf,
}

impl WorkspaceFileStore {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Result<Self, String> {
        let workspace_root = workspace_root.into();
        let canonical_root = workspace_root
            .canonicalize()
            .map_err(|err| format!("Failed to resolve workspace root: {err}"))?;

        if !canonical_root.is_dir() {
            return Err("Workspace root must be a directory".to_string());
        }

        Ok(Self {
            workspace_root: canonical_root,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn absolute_candidate(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn resolve_write_path(&self, path: &str) -> Result<PathBuf, String> {
        if path.trim().is_empty() {
            return Err("Path must not be empty".to_string());
        }

        let candidate = self.absolute_candidate(path);
        let parent = candidate.parent().ok_or_else(|| {
            format!(
                "Path {} has no parent directory and cannot be written safely",
                candidate.display()
            )
        })?;

        let anchor = canonicalize_existing_ancestor(parent)?;
        self.ensure_inside_workspace(&anchor)?;

        Ok(candidate)
    }

    fn ensure_inside_workspace(&self, canonical_path: &Path) -> Result<(), String> {
        if canonical_path.starts_with(&self.workspace_root) {
            Ok(())
        } else {
            Err(format!(
                "Path escapes workspace root: {}",
                canonical_path.display()
            ))
        }
    }
}

impl FileStore for WorkspaceFileStore {
    fn exists(&self, path: &str) -> bool {
        let candidate = self.absolute_candidate(path);
        let Ok(canonical) = candidate.canonicalize() else {
            return false;
        };
        self.ensure_inside_workspace(&canonical).is_ok() && canonical.is_file()
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), String> {
        if let Some(error) = sensitive_path_error(path) {
            return Err(error);
        }

        let resolved = self.resolve_write_path(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create parent directories {}: {error}",
                    parent.display()
                )
            })?;
        }

        fs::write(&resolved, content)
            .map_err(|error| format!("Failed to write file {}: {error}", resolved.display()))
    }
}

fn canonicalize_existing_ancestor(path: &Path) -> Result<PathBuf, String> {
    for ancestor in path.ancestors() {
        if ancestor.exists() {
            return ancestor.canonicalize().map_err(|error| {
                format!("Failed to resolve path {}: {error}", ancestor.display())
            });
        }
    }

    Err(format!(
        "No existing ancestor found for path {}",
        path.display()
    ))
}

/// In-memory store mirroring the tracked-files map of a live workspace.
/// Useful for permissive-policy decisions and headless harnesses.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    entries: BTreeMap<String, String>,
}

impl MemoryFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(path.into(), content.into());
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FileStore for MemoryFileStore {
    fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), String> {
        if let Some(error) = sensitive_path_error(path) {
            return Err(error);
        }

        self.entries.insert(path.to_string(), content.to_string());
        Ok(())
    }
}
