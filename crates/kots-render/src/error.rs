//! Render error types

use kots_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Target directory exists and overwriting was not requested
    #[error("directory {} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing kustomization could not be read as one
    #[error("failed to parse existing kustomization {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("failed to marshal {what}: {source}")]
    Marshal {
        what: String,
        #[source]
        source: CoreError,
    },

    /// A manifest path that would land outside its layer directory
    #[error("invalid file path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("cannot express {} relative to {}", to.display(), from.display())]
    RelativePath { from: PathBuf, to: PathBuf },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RenderError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn marshal(what: impl Into<String>, source: impl Into<CoreError>) -> Self {
        Self::Marshal {
            what: what.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
