//! Private registry options and the image pull secret derived from them

use base64::Engine as _;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::util::is_url;

/// Name of the pull secret written to midstream and referenced by patches
pub const PULL_SECRET_NAME: &str = "kotsadm-replicated-registry";

const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";
const DOCKER_CONFIG_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// Where application images are pushed and how to authenticate against it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryOptions {
    /// Registry host, optionally with port (`registry.example.com:5000`).
    /// A full URL is accepted and reduced to host and path.
    pub endpoint: String,
    /// Repository namespace images are pushed under
    pub namespace: String,
    pub username: String,
    pub password: String,
}

impl RegistryOptions {
    /// Load options from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CoreError::InvalidRegistry {
                message: format!("failed to read {}: {}", path.as_ref().display(), e),
            }
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Fill empty fields from `other`
    pub fn or(self, other: RegistryOptions) -> Self {
        fn pick(a: String, b: String) -> String {
            if a.is_empty() { b } else { a }
        }
        Self {
            endpoint: pick(self.endpoint, other.endpoint),
            namespace: pick(self.namespace, other.namespace),
            username: pick(self.username, other.username),
            password: pick(self.password, other.password),
        }
    }

    /// Whether images should be rewritten to this registry
    pub fn is_configured(&self) -> bool {
        !self.hostname().is_empty()
    }

    /// Whether a pull secret is needed
    pub fn requires_auth(&self) -> bool {
        self.is_configured() && !self.username.is_empty() && !self.password.is_empty()
    }

    /// Endpoint without scheme or trailing slash
    pub fn hostname(&self) -> String {
        let endpoint = self.endpoint.trim();
        if is_url(endpoint) {
            if let Ok(url) = url::Url::parse(endpoint) {
                let mut host = url.host_str().unwrap_or_default().to_string();
                if let Some(port) = url.port() {
                    host = format!("{}:{}", host, port);
                }
                let path = url.path().trim_matches('/');
                if !path.is_empty() {
                    host = format!("{}/{}", host, path);
                }
                return host;
            }
        }
        endpoint.trim_end_matches('/').to_string()
    }

    /// Prefix images are rewritten to: `<host>/<namespace>` or `<host>`
    pub fn image_prefix(&self) -> String {
        let namespace = self.namespace.trim_matches('/');
        if namespace.is_empty() {
            self.hostname()
        } else {
            format!("{}/{}", self.hostname(), namespace)
        }
    }

    /// Pull secret for this registry, or `None` when no credentials are set
    pub fn pull_secret(&self, namespace: Option<&str>) -> Result<Option<Secret>> {
        if !self.requires_auth() {
            return Ok(None);
        }

        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        let mut auths = serde_json::Map::new();
        auths.insert(self.hostname(), serde_json::json!({ "auth": auth }));
        let docker_config = serde_json::json!({ "auths": auths });
        let payload = serde_json::to_vec(&docker_config)?;

        Ok(Some(Secret {
            metadata: ObjectMeta {
                name: Some(PULL_SECRET_NAME.to_string()),
                namespace: namespace.map(str::to_string),
                ..Default::default()
            },
            type_: Some(DOCKER_CONFIG_TYPE.to_string()),
            data: Some(BTreeMap::from([(
                DOCKER_CONFIG_KEY.to_string(),
                ByteString(payload),
            )])),
            ..Default::default()
        }))
    }
}
