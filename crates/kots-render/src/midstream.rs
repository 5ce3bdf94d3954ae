//! Midstream layer: pull secret, secret patches and the merged kustomization
//!
//! Midstream is rewritten on every render but may have been edited by hand
//! in between. The kustomization found on disk is merged append-only with
//! the freshly computed one (see [`crate::merge`]), so re-rendering never
//! drops or reorders anything already listed.

use k8s_openapi::api::core::v1::Secret;
use kots_core::{Doc, Kustomization, PULL_SECRET_NAME};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};
use crate::kustomize::{KUSTOMIZATION_FILENAME, read_kustomization, write_kustomization};
use crate::merge::merge_kustomization;
use crate::paths::relative_path;

pub const SECRET_FILENAME: &str = "secret.yaml";
pub const PATCHES_FILENAME: &str = "pullsecrets.yaml";

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub midstream_dir: PathBuf,
    /// Base directory the midstream kustomization points at
    pub base_dir: PathBuf,
}

/// A midstream layer ready to be written
#[derive(Debug, Clone, Default)]
pub struct Midstream {
    /// Freshly computed kustomization (typically just image overrides)
    pub kustomization: Kustomization,
    /// Registry pull secret, if credentials are configured
    pub pull_secret: Option<Secret>,
    /// Workloads that get a pull secret patch
    pub doc_for_patches: Vec<Doc>,
}

impl Midstream {
    pub fn kustomization_filename(&self, options: &WriteOptions) -> PathBuf {
        options.midstream_dir.join(KUSTOMIZATION_FILENAME)
    }

    /// Write the midstream layer and return the kustomization persisted
    ///
    /// Files referenced by the kustomization are written before it. An
    /// existing kustomization that cannot be parsed aborts the write.
    pub fn write_midstream(&self, options: &WriteOptions) -> Result<Kustomization> {
        let kustomization_path = self.kustomization_filename(options);

        let existing = if kustomization_path.exists() {
            Some(read_kustomization(&kustomization_path)?)
        } else {
            None
        };

        // Relative base is resolved up front so a bad layout fails before any write
        let base = relative_path(&options.midstream_dir, &options.base_dir)?;

        fs::create_dir_all(&options.midstream_dir)
            .map_err(|e| RenderError::io("failed to mkdir", &options.midstream_dir, e))?;

        let mut kustomization = self.kustomization.clone();

        if let Some(secret) = self.write_pull_secret(options)? {
            push_unique(&mut kustomization.resources, secret);
        }

        if let Some(patches) = self.write_patches(options)? {
            push_unique(&mut kustomization.patches_strategic_merge, patches);
        }

        let mut kustomization = merge_kustomization(existing.as_ref(), kustomization);
        kustomization.bases = vec![base];

        write_kustomization(&kustomization, &kustomization_path)?;

        tracing::info!(
            dir = %options.midstream_dir.display(),
            merged = existing.is_some(),
            resources = kustomization.resources.len(),
            patches = kustomization.patches_strategic_merge.len(),
            images = kustomization.images.len(),
            "wrote midstream"
        );
        Ok(kustomization)
    }

    fn write_pull_secret(&self, options: &WriteOptions) -> Result<Option<String>> {
        let Some(secret) = &self.pull_secret else {
            return Ok(None);
        };

        let yaml = serde_yaml::to_string(secret).map_err(|e| RenderError::marshal("secret", e))?;
        write(&options.midstream_dir.join(SECRET_FILENAME), yaml.as_bytes(), "secret")?;

        Ok(Some(SECRET_FILENAME.to_string()))
    }

    fn write_patches(&self, options: &WriteOptions) -> Result<Option<String>> {
        if self.doc_for_patches.is_empty() {
            return Ok(None);
        }

        let mut content = String::new();
        for doc in &self.doc_for_patches {
            let patch = doc.with_pull_secret(PULL_SECRET_NAME);
            let yaml = serde_yaml::to_string(&patch)
                .map_err(|e| RenderError::marshal(format!("patch for {}", doc.display_name()), e))?;
            content.push_str("---\n");
            content.push_str(&yaml);
        }

        write(&options.midstream_dir.join(PATCHES_FILENAME), content.as_bytes(), "patches")?;
        Ok(Some(PATCHES_FILENAME.to_string()))
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn write(path: &Path, content: &[u8], what: &'static str) -> Result<()> {
    fs::write(path, content).map_err(|e| RenderError::io("failed to write", path, e))?;
    tracing::debug!(path = %path.display(), what, "wrote midstream file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kots_core::{Image, RegistryOptions};
    use tempfile::TempDir;

    const WEB: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    app: web
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: web
          image: myapp:1.0
"#;

    fn layout(dir: &TempDir) -> WriteOptions {
        WriteOptions {
            midstream_dir: dir.path().join("midstream"),
            base_dir: dir.path().join("base"),
        }
    }

    fn pull_secret() -> Secret {
        RegistryOptions {
            endpoint: "registry.example.com".to_string(),
            namespace: "team".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
        .pull_secret(None)
        .unwrap()
        .unwrap()
    }

    fn web_doc() -> Doc {
        Doc::parse(WEB.as_bytes()).unwrap().unwrap()
    }

    fn image(name: &str, new_name: &str) -> Image {
        Image {
            name: name.to_string(),
            new_name: Some(new_name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_render_with_secret_and_patch() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);

        let midstream = Midstream {
            kustomization: Kustomization::new(),
            pull_secret: Some(pull_secret()),
            doc_for_patches: vec![web_doc()],
        };
        let k = midstream.write_midstream(&opts).unwrap();

        assert_eq!(k.resources, vec![SECRET_FILENAME]);
        assert_eq!(k.patches_strategic_merge, vec![PATCHES_FILENAME]);
        assert_eq!(k.bases, vec!["../base"]);

        let secret = fs::read_to_string(opts.midstream_dir.join(SECRET_FILENAME)).unwrap();
        assert!(secret.contains("name: kotsadm-replicated-registry"));
        assert!(secret.contains("kubernetes.io/dockerconfigjson"));

        insta::assert_snapshot!(
            fs::read_to_string(opts.midstream_dir.join(PATCHES_FILENAME)).unwrap(),
            @r"
        ---
        apiVersion: apps/v1
        kind: Deployment
        metadata:
          name: web
        spec:
          template:
            spec:
              imagePullSecrets:
              - name: kotsadm-replicated-registry
        "
        );

        insta::assert_snapshot!(
            fs::read_to_string(midstream.kustomization_filename(&opts)).unwrap(),
            @r"
        apiVersion: kustomize.config.k8s.io/v1beta1
        kind: Kustomization
        bases:
        - ../base
        resources:
        - secret.yaml
        patchesStrategicMerge:
        - pullsecrets.yaml
        "
        );
    }

    #[test]
    fn test_rerender_keeps_hand_added_patch() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);
        fs::create_dir_all(&opts.midstream_dir).unwrap();

        let mut existing = Kustomization::new();
        existing.patches_strategic_merge = vec!["custom.yaml".to_string()];
        existing.bases = vec!["../somewhere-else".to_string()];
        write_kustomization(&existing, &opts.midstream_dir.join(KUSTOMIZATION_FILENAME)).unwrap();

        let k = Midstream {
            kustomization: Kustomization::new(),
            pull_secret: Some(pull_secret()),
            doc_for_patches: vec![web_doc()],
        }
        .write_midstream(&opts)
        .unwrap();

        assert_eq!(k.patches_strategic_merge, vec!["custom.yaml", PATCHES_FILENAME]);
        assert_eq!(k.resources, vec![SECRET_FILENAME]);
        assert_eq!(k.bases, vec!["../base"]);

        let on_disk = read_kustomization(&opts.midstream_dir.join(KUSTOMIZATION_FILENAME)).unwrap();
        assert_eq!(on_disk, k);
    }

    #[test]
    fn test_rerender_existing_image_override_wins() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);
        fs::create_dir_all(&opts.midstream_dir).unwrap();

        let mut existing = Kustomization::new();
        existing.images = vec![image("myapp", "myapp:old")];
        write_kustomization(&existing, &opts.midstream_dir.join(KUSTOMIZATION_FILENAME)).unwrap();

        let mut fresh = Kustomization::new();
        fresh.images = vec![image("myapp", "myapp:new"), image("redis", "mirror/redis")];

        let k = Midstream {
            kustomization: fresh,
            ..Default::default()
        }
        .write_midstream(&opts)
        .unwrap();

        assert_eq!(
            k.images,
            vec![image("myapp", "myapp:old"), image("redis", "mirror/redis")]
        );
    }

    #[test]
    fn test_no_secret_no_patches() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);

        let k = Midstream::default().write_midstream(&opts).unwrap();

        assert!(!opts.midstream_dir.join(SECRET_FILENAME).exists());
        assert!(!opts.midstream_dir.join(PATCHES_FILENAME).exists());
        assert!(k.resources.is_empty());
        assert!(k.patches_strategic_merge.is_empty());
        assert_eq!(k.bases, vec!["../base"]);
    }

    #[test]
    fn test_secret_without_patch_targets() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);

        let k = Midstream {
            kustomization: Kustomization::new(),
            pull_secret: Some(pull_secret()),
            doc_for_patches: Vec::new(),
        }
        .write_midstream(&opts)
        .unwrap();

        assert!(opts.midstream_dir.join(SECRET_FILENAME).exists());
        assert!(!opts.midstream_dir.join(PATCHES_FILENAME).exists());
        assert!(k.patches_strategic_merge.is_empty());
    }

    #[test]
    fn test_patch_file_has_one_document_per_target() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);

        let mut worker = web_doc();
        worker.kind = "StatefulSet".to_string();
        worker.metadata.name = "worker".to_string();

        Midstream {
            kustomization: Kustomization::new(),
            pull_secret: Some(pull_secret()),
            doc_for_patches: vec![web_doc(), worker],
        }
        .write_midstream(&opts)
        .unwrap();

        let content = fs::read_to_string(opts.midstream_dir.join(PATCHES_FILENAME)).unwrap();
        let docs = kots_core::document::documents(content.as_bytes()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"].as_str(), Some("StatefulSet"));
        assert_eq!(docs[1]["metadata"]["name"].as_str(), Some("worker"));
    }

    #[test]
    fn test_rerender_is_stable() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);
        let midstream = Midstream {
            kustomization: Kustomization::new(),
            pull_secret: Some(pull_secret()),
            doc_for_patches: vec![web_doc()],
        };

        let first = midstream.write_midstream(&opts).unwrap();
        let second = midstream.write_midstream(&opts).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_existing_kustomization_aborts() {
        let dir = TempDir::new().unwrap();
        let opts = layout(&dir);
        fs::create_dir_all(&opts.midstream_dir).unwrap();
        fs::write(
            opts.midstream_dir.join(KUSTOMIZATION_FILENAME),
            "resources: {not: [a list",
        )
        .unwrap();

        let err = Midstream {
            pull_secret: Some(pull_secret()),
            ..Default::default()
        }
        .write_midstream(&opts)
        .unwrap_err();

        assert!(matches!(err, RenderError::Parse { .. }));
        assert!(!opts.midstream_dir.join(SECRET_FILENAME).exists());
    }

    #[test]
    fn test_mixed_absolute_and_relative_dirs_fail_before_writing() {
        let dir = TempDir::new().unwrap();
        let opts = WriteOptions {
            midstream_dir: dir.path().join("midstream"),
            base_dir: PathBuf::from("relative/base"),
        };

        let err = Midstream {
            pull_secret: Some(pull_secret()),
            ..Default::default()
        }
        .write_midstream(&opts)
        .unwrap_err();

        assert!(matches!(err, RenderError::RelativePath { .. }));
        assert!(!opts.midstream_dir.exists());
    }
}
