//! Kustomize `kustomization.yaml` document
//!
//! Only the fields the renderer manages are typed. Everything else found in a
//! hand-edited file (`namePrefix`, `commonLabels`, ...) is carried through
//! `extra` so that re-rendering never drops it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const KUSTOMIZATION_KIND: &str = "Kustomization";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Parent directories, relative to the kustomization's own directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    /// Resource files, relative to the kustomization's own directory.
    /// Order is apply order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_strategic_merge: Vec<String>,

    /// Image rewrite rules, keyed by `name`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,

    /// Fields the renderer does not manage
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// A Kustomize image override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Source image name, without tag or digest
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Kustomization {
    /// Empty kustomization with Kustomize's type metadata set
    pub fn new() -> Self {
        Self {
            api_version: KUSTOMIZATION_API_VERSION.to_string(),
            kind: KUSTOMIZATION_KIND.to_string(),
            ..Default::default()
        }
    }

    /// Kustomization listing the given resources
    pub fn with_resources(resources: Vec<String>) -> Self {
        Self {
            resources,
            ..Self::new()
        }
    }

    /// Parse from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML text
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
