//! Reading and writing `kustomization.yaml`

use kots_core::Kustomization;
use std::fs;
use std::path::Path;

use crate::error::{RenderError, Result};

pub const KUSTOMIZATION_FILENAME: &str = "kustomization.yaml";

/// Load a kustomization file
///
/// Unreadable or unparsable files are errors; a corrupt file is never
/// treated as absent.
pub fn read_kustomization(path: &Path) -> Result<Kustomization> {
    let content = fs::read_to_string(path)
        .map_err(|e| RenderError::io("failed to read kustomization", path, e))?;

    Kustomization::from_yaml(&content).map_err(|source| RenderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_kustomization(kustomization: &Kustomization, path: &Path) -> Result<()> {
    let yaml = kustomization
        .to_yaml()
        .map_err(|e| RenderError::marshal("kustomization", e))?;

    fs::write(path, yaml).map_err(|e| RenderError::io("failed to write kustomization", path, e))?;

    tracing::debug!(
        path = %path.display(),
        resources = kustomization.resources.len(),
        patches = kustomization.patches_strategic_merge.len(),
        images = kustomization.images.len(),
        "wrote kustomization"
    );
    Ok(())
}
