//! Path handling for the storage tree.
//!
//! Every physical path the engine touches is derived here:
//! - display names are sanitized into single path components
//! - child paths are normalized and must stay under the storage root
//! - collision-free names are generated for copies

use std::path::{Component, Path, PathBuf};

use crate::{PortalError, Result};

/// Characters that may not appear in a stored name.
const FORBIDDEN: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Upper bound on `name (n)` candidates tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Derives and checks filesystem paths under a fixed storage root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given storage root.
    ///
    /// Relative roots are made absolute against the working directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let absolute = std::path::absolute(root.as_ref())?;
        Ok(Self {
            root: normalize(&absolute),
        })
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn a display name into a single safe path component.
    ///
    /// Runs of `\ / : * ? " < > |` become `_` and control characters are
    /// dropped. Non-empty input never sanitizes to an empty string.
    pub fn sanitize(name: &str) -> String {
        let trimmed = name.trim();
        let mut out = String::with_capacity(trimmed.len());
        let mut in_run = false;

        for c in trimmed.chars().filter(|c| !c.is_control()) {
            if FORBIDDEN.contains(&c) {
                if !in_run {
                    out.push('_');
                    in_run = true;
                }
            } else {
                out.push(c);
                in_run = false;
            }
        }

        if out == "." || out == ".." || (out.is_empty() && !name.is_empty()) {
            return "_".to_string();
        }
        out
    }

    /// Path of `name` inside `parent`.
    ///
    /// Pass [`PathResolver::root`] as the parent for top-level folders.
    pub fn resolve(&self, parent: &Path, name: &str) -> Result<PathBuf> {
        let component = Self::sanitize(name);
        if component.is_empty() {
            return Err(PortalError::Validation("name must not be empty".to_string()));
        }
        self.ensure_within_root(&parent.join(component))
    }

    /// Normalize `path` and reject it unless it lies strictly below the root.
    pub fn ensure_within_root(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_absolute() {
            return Err(PortalError::Validation(format!(
                "path is not absolute: {}",
                path.display()
            )));
        }

        let normalized = normalize(path);
        if normalized == self.root || !normalized.starts_with(&self.root) {
            return Err(PortalError::Validation(format!(
                "path escapes the storage root: {}",
                path.display()
            )));
        }
        Ok(normalized)
    }

    /// First of `base`, `base (2)`, `base (3)`, ... not present on disk in `target_dir`.
    pub fn generate_available_name(&self, base: &str, target_dir: &Path) -> Result<String> {
        self.generate_available_name_with(base, target_dir, |_| false)
    }

    /// Like [`PathResolver::generate_available_name`], also skipping paths
    /// for which `taken` returns true.
    pub fn generate_available_name_with<F>(
        &self,
        base: &str,
        target_dir: &Path,
        taken: F,
    ) -> Result<String>
    where
        F: Fn(&Path) -> bool,
    {
        first_free(target_dir, taken, |n| numbered(base, n))
    }

    /// Variant for file names: the counter goes before the extension,
    /// so `report.pdf` becomes `report (2).pdf`.
    pub fn generate_available_file_name_with<F>(
        &self,
        base: &str,
        target_dir: &Path,
        taken: F,
    ) -> Result<String>
    where
        F: Fn(&Path) -> bool,
    {
        let (stem, ext) = split_extension(base);
        first_free(target_dir, taken, |n| {
            let stem = numbered(stem, n);
            match ext {
                Some(ext) => format!("{stem}.{ext}"),
                None => stem,
            }
        })
    }

    /// Replace `old_prefix` at the start of `path` with `new_prefix`.
    pub fn rebase(path: &Path, old_prefix: &Path, new_prefix: &Path) -> Result<PathBuf> {
        let rest = path.strip_prefix(old_prefix).map_err(|_| {
            PortalError::State(format!(
                "{} is not under {}",
                path.display(),
                old_prefix.display()
            ))
        })?;

        if rest.as_os_str().is_empty() {
            Ok(new_prefix.to_path_buf())
        } else {
            Ok(new_prefix.join(rest))
        }
    }
}

fn numbered(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{base} ({n})")
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn first_free<F, N>(target_dir: &Path, taken: F, candidate: N) -> Result<String>
where
    F: Fn(&Path) -> bool,
    N: Fn(u32) -> String,
{
    for n in 1..=MAX_NAME_ATTEMPTS {
        let name = candidate(n);
        let path = target_dir.join(PathResolver::sanitize(&name));
        if !path.exists() && !taken(&path) {
            return Ok(name);
        }
    }
    Err(PortalError::Conflict(format!(
        "no free name for '{}' in {}",
        candidate(1),
        target_dir.display()
    )))
}

/// Lexically normalize a path, resolving `.` and `..` without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
