//! Base layer: the rendered upstream files plus their resource list
//!
//! The base is always regenerated from scratch. There is no merge with a
//! previous base; an existing directory is either replaced (`overwrite`) or
//! the write is refused before anything is touched.

use kots_core::{Kustomization, ManifestFile};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};
use crate::kustomize::{KUSTOMIZATION_FILENAME, write_kustomization};
use crate::paths::{clean_relative, overlays_dir};

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub base_dir: PathBuf,
    /// Replace an existing base directory instead of failing
    pub overwrite: bool,
    /// Keep kots-owned kinds out of the base filesystem
    pub exclude_kots_kinds: bool,
}

/// The set of files making up the base layer, in source order
#[derive(Debug, Clone, Default)]
pub struct Base {
    pub files: Vec<ManifestFile>,
}

impl Base {
    pub fn new(files: Vec<ManifestFile>) -> Self {
        Self { files }
    }

    /// Write every file to the base directory and generate its kustomization
    ///
    /// Files are classified independently for the filesystem and for the
    /// resource list. Resource order follows input order and is not
    /// deduplicated here. On failure, files already written stay on disk.
    pub fn write_base(&self, options: &WriteOptions) -> Result<Kustomization> {
        let render_dir = &options.base_dir;

        // Reject bad paths before anything is removed or written
        let cleaned = self
            .files
            .iter()
            .map(|file| clean_relative(&file.path))
            .collect::<Result<Vec<_>>>()?;

        if render_dir.exists() {
            if !options.overwrite {
                return Err(RenderError::AlreadyExists {
                    path: render_dir.clone(),
                });
            }
            tracing::debug!(dir = %render_dir.display(), "removing previous base");
            fs::remove_dir_all(render_dir).map_err(|e| {
                RenderError::io("failed to remove previous content in base", render_dir, e)
            })?;
        }

        fs::create_dir_all(render_dir)
            .map_err(|e| RenderError::io("failed to mkdir", render_dir, e))?;

        let mut resources = Vec::new();
        for (file, rel_path) in self.files.iter().zip(cleaned) {
            let write_to_base =
                file.should_be_included_in_base_filesystem(options.exclude_kots_kinds);
            let write_to_kustomization =
                file.should_be_included_in_base_kustomization(options.exclude_kots_kinds);

            if !write_to_base && !write_to_kustomization {
                tracing::debug!(path = %file.path, "skipping file");
                continue;
            }

            if write_to_base {
                write_file(render_dir, &rel_path, &file.content)?;
            }

            if write_to_kustomization {
                resources.push(rel_path);
            }
        }

        let kustomization = Kustomization::with_resources(resources);
        write_kustomization(&kustomization, &render_dir.join(KUSTOMIZATION_FILENAME))?;

        tracing::info!(
            dir = %render_dir.display(),
            files = self.files.len(),
            resources = kustomization.resources.len(),
            "wrote base"
        );
        Ok(kustomization)
    }

    /// Sibling overlays directory for this base
    pub fn overlays_dir(&self, options: &WriteOptions) -> PathBuf {
        overlays_dir(&options.base_dir)
    }
}

fn write_file(render_dir: &Path, rel_path: &str, content: &[u8]) -> Result<()> {
    let path = render_dir.join(rel_path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RenderError::io("failed to mkdir", parent, e))?;
    }

    fs::write(&path, content).map_err(|e| RenderError::io("failed to write base file", &path, e))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote base file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEPLOYMENT: &str = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n";
    const SERVICE: &str = "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n";
    const KOTS_APP: &str =
        "apiVersion: kots.io/v1beta1\nkind: Application\nmetadata:\n  name: app\n";

    fn files() -> Vec<ManifestFile> {
        vec![
            ManifestFile::new("deployment.yaml", DEPLOYMENT),
            ManifestFile::new("kots-app.yaml", KOTS_APP),
            ManifestFile::new("nested/dir/service.yaml", SERVICE),
            ManifestFile::new("README.md", "hello"),
        ]
    }

    fn options(dir: &TempDir) -> WriteOptions {
        WriteOptions {
            base_dir: dir.path().join("base"),
            overwrite: false,
            exclude_kots_kinds: false,
        }
    }

    #[test]
    fn test_write_base_layout() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);

        let k = Base::new(files()).write_base(&opts).unwrap();

        assert_eq!(k.resources, vec!["deployment.yaml", "nested/dir/service.yaml"]);
        assert!(k.bases.is_empty());
        assert!(k.patches_strategic_merge.is_empty());

        let base = &opts.base_dir;
        assert_eq!(fs::read_to_string(base.join("deployment.yaml")).unwrap(), DEPLOYMENT);
        assert_eq!(
            fs::read_to_string(base.join("nested/dir/service.yaml")).unwrap(),
            SERVICE
        );
        assert!(base.join("kots-app.yaml").exists());
        assert!(base.join("README.md").exists());

        insta::assert_snapshot!(
            fs::read_to_string(base.join(KUSTOMIZATION_FILENAME)).unwrap(),
            @r"
        apiVersion: kustomize.config.k8s.io/v1beta1
        kind: Kustomization
        resources:
        - deployment.yaml
        - nested/dir/service.yaml
        "
        );
    }

    #[test]
    fn test_exclude_kots_kinds() {
        let dir = TempDir::new().unwrap();
        let opts = WriteOptions {
            exclude_kots_kinds: true,
            ..options(&dir)
        };

        Base::new(files()).write_base(&opts).unwrap();
        assert!(!opts.base_dir.join("kots-app.yaml").exists());
        assert!(opts.base_dir.join("deployment.yaml").exists());
    }

    #[test]
    fn test_existing_dir_without_overwrite_is_untouched() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        Base::new(files()).write_base(&opts).unwrap();

        let marker = opts.base_dir.join("hand-edit.yaml");
        fs::write(&marker, "keep me").unwrap();

        let err = Base::new(vec![ManifestFile::new("other.yaml", SERVICE)])
            .write_base(&opts)
            .unwrap_err();
        assert!(matches!(err, RenderError::AlreadyExists { .. }));

        assert_eq!(fs::read_to_string(&marker).unwrap(), "keep me");
        assert!(!opts.base_dir.join("other.yaml").exists());
    }

    #[test]
    fn test_overwrite_replaces_everything() {
        let dir = TempDir::new().unwrap();
        let opts = WriteOptions {
            overwrite: true,
            ..options(&dir)
        };
        Base::new(files()).write_base(&opts).unwrap();
        fs::write(opts.base_dir.join("stale.yaml"), "old").unwrap();

        let k = Base::new(vec![ManifestFile::new("service.yaml", SERVICE)])
            .write_base(&opts)
            .unwrap();

        assert_eq!(k.resources, vec!["service.yaml"]);
        assert!(!opts.base_dir.join("stale.yaml").exists());
        assert!(!opts.base_dir.join("deployment.yaml").exists());
    }

    #[test]
    fn test_rendering_twice_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let opts = WriteOptions {
            overwrite: true,
            ..options(&dir)
        };

        let snapshot = |base: &Path| -> Vec<(String, Vec<u8>)> {
            let mut out = Vec::new();
            for rel in [
                "deployment.yaml",
                "kots-app.yaml",
                "nested/dir/service.yaml",
                "README.md",
                KUSTOMIZATION_FILENAME,
            ] {
                out.push((rel.to_string(), fs::read(base.join(rel)).unwrap()));
            }
            out
        };

        Base::new(files()).write_base(&opts).unwrap();
        let first = snapshot(&opts.base_dir);
        Base::new(files()).write_base(&opts).unwrap();
        let second = snapshot(&opts.base_dir);

        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_paths_are_kept_in_resources() {
        let dir = TempDir::new().unwrap();
        let k = Base::new(vec![
            ManifestFile::new("svc.yaml", SERVICE),
            ManifestFile::new("./svc.yaml", SERVICE),
        ])
        .write_base(&options(&dir))
        .unwrap();

        assert_eq!(k.resources, vec!["svc.yaml", "svc.yaml"]);
    }

    #[test]
    fn test_escaping_path_is_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);

        let err = Base::new(vec![
            ManifestFile::new("ok.yaml", SERVICE),
            ManifestFile::new("../escape.yaml", SERVICE),
        ])
        .write_base(&opts)
        .unwrap_err();

        assert!(matches!(err, RenderError::InvalidPath { .. }));
        assert!(!opts.base_dir.exists());
        assert!(!dir.path().join("escape.yaml").exists());
    }

    #[test]
    fn test_overlays_dir() {
        let opts = WriteOptions {
            base_dir: PathBuf::from("/render/app/base"),
            ..Default::default()
        };
        assert_eq!(
            Base::default().overlays_dir(&opts),
            PathBuf::from("/render/app/overlays")
        );
    }
}
