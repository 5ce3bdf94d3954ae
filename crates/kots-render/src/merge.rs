//! Append-only merging of a freshly computed kustomization into an existing one
//!
//! Existing entries keep their position; new entries are appended in their
//! computed order, skipping anything already present. Comparison is literal
//! string equality, with images keyed by `name` alone.

use kots_core::{Image, Kustomization};

/// `existing` followed by each entry of `new` not seen so far
pub fn merge_strings(existing: &[String], new: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for item in new {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// `existing` followed by each image of `new` whose name is not taken yet
///
/// An existing override for a name always wins over a recomputed one.
pub fn merge_images(existing: &[Image], new: &[Image]) -> Vec<Image> {
    let mut merged = existing.to_vec();
    for image in new {
        if merged.iter().any(|m| m.name == image.name) {
            tracing::debug!(image = %image.name, "keeping existing image override");
            continue;
        }
        merged.push(image.clone());
    }
    merged
}

/// Merge `new` into `existing`, or return `new` untouched on a first render
///
/// Fields the renderer does not manage (and `bases`) are taken from
/// `existing`; callers recompute `bases` afterwards.
pub fn merge_kustomization(existing: Option<&Kustomization>, new: Kustomization) -> Kustomization {
    let Some(existing) = existing else {
        return new;
    };

    let mut merged = existing.clone();
    if merged.api_version.is_empty() {
        merged.api_version = new.api_version;
    }
    if merged.kind.is_empty() {
        merged.kind = new.kind;
    }
    merged.images = merge_images(&existing.images, &new.images);
    merged.patches_strategic_merge =
        merge_strings(&existing.patches_strategic_merge, &new.patches_strategic_merge);
    merged.resources = merge_strings(&existing.resources, &new.resources);
    merged
}
