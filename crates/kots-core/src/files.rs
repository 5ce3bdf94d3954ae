//! Rendered upstream files and the rules deciding where they land in `base/`

use serde::{Deserialize, Serialize};

use crate::document::Doc;

/// A single rendered file, path relative to the upstream root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Relative path, `/`-separated
    pub path: String,
    /// Raw file content
    pub content: Vec<u8>,
}

impl ManifestFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Whether the file looks like YAML by extension
    pub fn is_yaml(&self) -> bool {
        self.path.ends_with(".yaml") || self.path.ends_with(".yml")
    }

    /// Document view of the file, `None` when it is not YAML or does not parse
    pub fn doc(&self) -> Option<Doc> {
        if !self.is_yaml() {
            return None;
        }
        Doc::parse(&self.content).ok().flatten()
    }

    /// Whether the file is written to the base directory
    ///
    /// Everything is written except files annotated with `kots.io/exclude`
    /// and, when `exclude_kots_kinds` is set, kots-owned kinds.
    pub fn should_be_included_in_base_filesystem(&self, exclude_kots_kinds: bool) -> bool {
        match self.doc() {
            Some(doc) if doc.is_excluded() => false,
            Some(doc) if exclude_kots_kinds && doc.is_kots_kind() => false,
            _ => true,
        }
    }

    /// Whether the file is listed in the base `kustomization.yaml`
    ///
    /// Only deployable Kubernetes documents qualify. Kots kinds are never
    /// deployed, whatever `exclude_kots_kinds` says; the flag only governs
    /// whether they are kept on disk.
    pub fn should_be_included_in_base_kustomization(&self, _exclude_kots_kinds: bool) -> bool {
        match self.doc() {
            Some(doc) => doc.is_kubernetes_resource() && !doc.is_kots_kind() && !doc.is_excluded(),
            None => false,
        }
    }
}
