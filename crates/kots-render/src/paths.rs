//! Directory layout helpers
//!
//! `base`, `midstream` and `overlays` are siblings under one render root.
//! All computations here are lexical; nothing touches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{RenderError, Result};

pub const MIDSTREAM_DIR_NAME: &str = "midstream";
pub const OVERLAYS_DIR_NAME: &str = "overlays";

/// Sibling `overlays` directory of a base directory (`<base>/../overlays`)
pub fn overlays_dir(base_dir: &Path) -> PathBuf {
    sibling_dir(base_dir, OVERLAYS_DIR_NAME)
}

/// Sibling `midstream` directory of a base directory
pub fn midstream_dir(base_dir: &Path) -> PathBuf {
    sibling_dir(base_dir, MIDSTREAM_DIR_NAME)
}

fn sibling_dir(dir: &Path, name: &str) -> PathBuf {
    normalize(&dir.join("..").join(name))
}

/// Lexically resolve `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

/// Clean a manifest path so it stays inside the directory it is written to
///
/// Returns the `/`-separated form used in kustomization resource lists.
pub fn clean_relative(path: &str) -> Result<String> {
    let invalid = |reason: &str| RenderError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.starts_with('/') || Path::new(path).is_absolute() {
        return Err(invalid("absolute paths are not allowed"));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(invalid("path escapes the layer directory"));
                }
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return Err(invalid("path does not name a file"));
    }

    Ok(parts.join("/"))
}

/// `to` expressed relative to `from`, `/`-separated
pub fn relative_path(from: &Path, to: &Path) -> Result<String> {
    let from = normalize(from);
    let to = normalize(to);

    let mismatch = || RenderError::RelativePath {
        from: from.clone(),
        to: to.clone(),
    };

    if from.is_absolute() != to.is_absolute() {
        return Err(mismatch());
    }

    let relative = pathdiff::diff_paths(&to, &from).ok_or_else(mismatch)?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if parts.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(parts.join("/"))
    }
}
