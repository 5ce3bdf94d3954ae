//! Container image discovery and private registry rewrites

use kots_core::document::{documents, lookup};
use kots_core::{Doc, Image, ManifestFile, PULL_SECRET_NAME, RegistryOptions};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Image reference without tag or digest (`docker.io/library/nginx:1.25` ->
/// `docker.io/library/nginx`)
pub fn image_name(image: &str) -> &str {
    let without_digest = image.split_once('@').map_or(image, |(name, _)| name);
    match without_digest.rfind(':') {
        // A colon before the last slash belongs to a registry port
        Some(colon) if !without_digest[colon..].contains('/') => &without_digest[..colon],
        _ => without_digest,
    }
}

/// Pod template spec of a workload document
///
/// Only `spec.template.spec` is considered: it is the one place the pull
/// secret patch can reach, so images elsewhere (CronJob job templates, bare
/// Pods) are left pointing at their original registry.
fn pod_template_spec(doc: &Value) -> Option<&Value> {
    lookup(doc, &["spec", "template", "spec"])
}

fn container_images(pod_spec: &Value) -> impl Iterator<Item = &str> {
    ["containers", "initContainers"]
        .into_iter()
        .filter_map(|key| pod_spec.get(key).and_then(Value::as_sequence))
        .flatten()
        .filter_map(|container| container.get("image").and_then(Value::as_str))
}

/// Every distinct image referenced by pod templates, sorted
pub fn find_images(docs: &[Value]) -> Vec<String> {
    docs.iter()
        .filter_map(pod_template_spec)
        .flat_map(container_images)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Image overrides pointing every image at the configured registry
///
/// Empty when no registry is configured. Tags and digests are left alone;
/// images already under the registry prefix are skipped.
pub fn rewrite_images(images: &[String], registry: &RegistryOptions) -> Vec<Image> {
    if !registry.is_configured() {
        return Vec::new();
    }
    let prefix = registry.image_prefix();

    let mut rewrites = BTreeMap::new();
    for image in images {
        let name = image_name(image);
        if name.starts_with(&format!("{}/", prefix)) {
            continue;
        }
        let short = name.rsplit('/').next().unwrap_or(name);
        rewrites.entry(name.to_string()).or_insert_with(|| Image {
            name: name.to_string(),
            new_name: Some(format!("{}/{}", prefix, short)),
            ..Default::default()
        });
    }

    rewrites.into_values().collect()
}

/// Workloads whose pod template pulls a rewritten image
///
/// Documents that already reference the pull secret are skipped.
pub fn docs_needing_pull_secret(files: &[ManifestFile], rewritten: &[Image]) -> Vec<Doc> {
    let mut out = Vec::new();

    for file in files {
        if !file.is_yaml() {
            continue;
        }
        let Ok(docs) = documents(&file.content) else {
            continue;
        };

        for value in &docs {
            let Some(template_spec) = pod_template_spec(value) else {
                continue;
            };
            let pulls_rewritten = container_images(template_spec)
                .any(|image| rewritten.iter().any(|r| r.name == image_name(image)));
            if !pulls_rewritten {
                continue;
            }

            let doc = Doc::from_value(value);
            let has_secret = doc
                .spec
                .template
                .spec
                .image_pull_secrets
                .iter()
                .any(|s| s.name == PULL_SECRET_NAME);
            if has_secret || !doc.is_kubernetes_resource() {
                continue;
            }

            tracing::debug!(doc = %doc.display_name(), path = %file.path, "needs pull secret");
            out.push(doc);
        }
    }

    out
}
