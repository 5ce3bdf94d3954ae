//! Kots Render - base, midstream and overlay layers for Kustomize
//!
//! Takes rendered upstream files and produces:
//!
//! ```text
//! base/<files...>
//! base/kustomization.yaml
//! midstream/kustomization.yaml   # bases: [../base]
//! midstream/secret.yaml          # when registry credentials are set
//! midstream/pullsecrets.yaml     # strategic merge patches
//! overlays/                      # sibling, left to the user
//! ```
//!
//! The base layer is regenerated from scratch on every render. Midstream is
//! merged with whatever is already on disk: new resources, patches and images
//! are appended, existing entries are never removed or reordered.

pub mod base;
pub mod error;
pub mod images;
pub mod kustomize;
pub mod merge;
pub mod midstream;
pub mod paths;
pub mod render;

pub use base::{Base, WriteOptions as BaseWriteOptions};
pub use error::{RenderError, Result};
pub use midstream::{Midstream, WriteOptions as MidstreamWriteOptions};
pub use render::{RenderOptions, RenderSummary, render};
