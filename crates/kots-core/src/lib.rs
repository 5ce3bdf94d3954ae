//! Kots Core - shared types for the kots manifest render pipeline
//!
//! This crate provides the foundational types used by the renderer:
//! - `Doc`: a narrow view over a Kubernetes manifest (identity + pull secrets)
//! - `Kustomization`: the Kustomize document written for each layer
//! - `ManifestFile`: a rendered upstream file and its inclusion rules
//! - `RegistryOptions`: private registry settings and pull secret construction

pub mod document;
pub mod error;
pub mod files;
pub mod kustomization;
pub mod registry;
pub mod util;

pub use document::{Doc, ImagePullSecret, Metadata, PodSpec, Spec, Template};
pub use error::{CoreError, Result};
pub use files::ManifestFile;
pub use kustomization::{Image, Kustomization};
pub use registry::{PULL_SECRET_NAME, RegistryOptions};
