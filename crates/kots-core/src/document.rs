//! Narrow view over a Kubernetes manifest document
//!
//! The renderer never needs a fully typed object. It needs to know what a
//! document is (`apiVersion`, `kind`, `metadata.name`) and to build a minimal
//! copy that injects an image pull secret into the pod template. Parsing is
//! lenient: fields of the wrong shape come back empty instead of failing.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::error::Result;

/// Annotation that removes a file from both the base filesystem and the
/// base kustomization.
pub const EXCLUDE_ANNOTATION: &str = "kots.io/exclude";

/// API groups owned by kots itself rather than the application
const KOTS_GROUPS: &[&str] = &["kots.io", "troubleshoot.replicated.com", "troubleshoot.sh"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Spec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub template: Template,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(
        rename = "imagePullSecrets",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub image_pull_secrets: Vec<ImagePullSecret>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePullSecret {
    pub name: String,
}

impl Doc {
    /// Parse the first non-empty document of a (possibly multi-document) file
    ///
    /// Returns `None` for files with no YAML content at all. Invalid YAML is
    /// an error; a valid document of an unexpected shape yields empty fields.
    pub fn parse(content: &[u8]) -> Result<Option<Doc>> {
        Ok(documents(content)?.first().map(Doc::from_value))
    }

    /// Build a document view out of an arbitrary YAML value
    pub fn from_value(value: &Value) -> Doc {
        let annotations: BTreeMap<String, String> = lookup(value, &["metadata", "annotations"])
            .and_then(Value::as_mapping)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_string(v)?)))
                    .collect()
            })
            .unwrap_or_default();

        let image_pull_secrets: Vec<ImagePullSecret> =
            lookup(value, &["spec", "template", "spec", "imagePullSecrets"])
                .and_then(Value::as_sequence)
                .map(|seq| {
                    seq.iter()
                        .filter_map(|s| s.get("name").and_then(Value::as_str))
                        .map(|name| ImagePullSecret {
                            name: name.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();

        Doc {
            api_version: lookup_str(value, &["apiVersion"]),
            kind: lookup_str(value, &["kind"]),
            metadata: Metadata {
                name: lookup_str(value, &["metadata", "name"]),
                namespace: lookup(value, &["metadata", "namespace"])
                    .and_then(Value::as_str)
                    .map(str::to_string),
                annotations,
            },
            spec: Spec {
                template: Template {
                    spec: PodSpec { image_pull_secrets },
                },
            },
        }
    }

    /// API group of the document (empty for the core group)
    pub fn group(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    /// Whether the document is one of the kots-owned kinds
    /// (Application, Config, License, Preflight, ...)
    pub fn is_kots_kind(&self) -> bool {
        KOTS_GROUPS.contains(&self.group())
    }

    /// Whether the document identifies itself as a Kubernetes object
    pub fn is_kubernetes_resource(&self) -> bool {
        !self.api_version.is_empty() && !self.kind.is_empty()
    }

    /// Whether the author asked for this document to be left out
    pub fn is_excluded(&self) -> bool {
        self.metadata
            .annotations
            .get(EXCLUDE_ANNOTATION)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Minimal strategic merge patch carrying only the identity of this
    /// document and a single pod-template pull secret reference
    pub fn with_pull_secret(&self, secret_name: &str) -> Doc {
        Doc {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            metadata: Metadata {
                name: self.metadata.name.clone(),
                ..Default::default()
            },
            spec: Spec {
                template: Template {
                    spec: PodSpec {
                        image_pull_secrets: vec![ImagePullSecret {
                            name: secret_name.to_string(),
                        }],
                    },
                },
            },
        }
    }

    /// `Kind/name` for logs
    pub fn display_name(&self) -> String {
        if self.metadata.name.is_empty() {
            self.kind.clone()
        } else {
            format!("{}/{}", self.kind, self.metadata.name)
        }
    }
}

/// Split a YAML stream into its non-null documents
pub fn documents(content: &[u8]) -> Result<Vec<Value>> {
    let mut docs = Vec::new();
    for de in serde_yaml::Deserializer::from_slice(content) {
        let value = Value::deserialize(de)?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Walk a mapping path, returning `None` as soon as a segment is missing
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn lookup_str(value: &Value, path: &[&str]) -> String {
    lookup(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
