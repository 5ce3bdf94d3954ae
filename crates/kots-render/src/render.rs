//! End-to-end render: base, then midstream on top of it

use kots_core::document::documents;
use kots_core::{Kustomization, ManifestFile, RegistryOptions};
use std::path::PathBuf;

use crate::base::{self, Base};
use crate::error::Result;
use crate::images::{docs_needing_pull_secret, find_images, rewrite_images};
use crate::midstream::{self, Midstream};
use crate::paths::midstream_dir;

pub const BASE_DIR_NAME: &str = "base";

/// Options for a full render into one render root
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Root holding `base/`, `midstream/` and `overlays/`
    pub render_dir: PathBuf,
    pub overwrite: bool,
    pub exclude_kots_kinds: bool,
    pub registry: RegistryOptions,
    /// Namespace set on the generated pull secret
    pub namespace: Option<String>,
}

/// What a render wrote, for reporting
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub base: Kustomization,
    pub midstream: Kustomization,
    pub base_dir: PathBuf,
    pub midstream_dir: PathBuf,
    pub overlays_dir: PathBuf,
}

/// Render `files` into `options.render_dir`
///
/// The base is written first; midstream is only written once the base
/// succeeded, since its kustomization points at it.
pub fn render(files: Vec<ManifestFile>, options: &RenderOptions) -> Result<RenderSummary> {
    let base_dir = options.render_dir.join(BASE_DIR_NAME);
    let midstream_dir = midstream_dir(&base_dir);

    let base = Base::new(files);
    let base_options = base::WriteOptions {
        base_dir: base_dir.clone(),
        overwrite: options.overwrite,
        exclude_kots_kinds: options.exclude_kots_kinds,
    };
    let base_kustomization = base.write_base(&base_options)?;
    let overlays_dir = base.overlays_dir(&base_options);

    let deployed: Vec<ManifestFile> = base
        .files
        .into_iter()
        .filter(|file| file.should_be_included_in_base_kustomization(options.exclude_kots_kinds))
        .collect();

    let docs: Vec<_> = deployed
        .iter()
        .filter_map(|file| documents(&file.content).ok())
        .flatten()
        .collect();
    let images = rewrite_images(&find_images(&docs), &options.registry);

    let pull_secret = options.registry.pull_secret(options.namespace.as_deref())?;
    let doc_for_patches = if pull_secret.is_some() {
        docs_needing_pull_secret(&deployed, &images)
    } else {
        tracing::debug!("no registry credentials, skipping pull secret patches");
        Vec::new()
    };

    let midstream = Midstream {
        kustomization: Kustomization {
            images,
            ..Kustomization::new()
        },
        pull_secret,
        doc_for_patches,
    };
    let midstream_kustomization = midstream.write_midstream(&midstream::WriteOptions {
        midstream_dir: midstream_dir.clone(),
        base_dir: base_dir.clone(),
    })?;

    Ok(RenderSummary {
        base: base_kustomization,
        midstream: midstream_kustomization,
        base_dir,
        midstream_dir,
        overlays_dir,
    })
}
