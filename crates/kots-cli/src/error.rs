//! CLI error types with exit code handling

use kots_render::RenderError;
use kots_template::{EngineError, TemplateError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid user input (missing source, unreadable registry config)
    #[error("Invalid input: {message}")]
    #[diagnostic(code(kots::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    /// Writing the base or midstream layer failed
    #[error("Render failed: {message}")]
    #[diagnostic(code(kots::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(kots::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(kots::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::AlreadyExists { .. } => CliError::Render {
                message: err.to_string(),
                help: Some("pass --overwrite to replace the previous render".to_string()),
            },
            RenderError::Parse { .. } => CliError::Render {
                message: err.to_string(),
                help: Some("fix or remove the hand-edited kustomization.yaml".to_string()),
            },
            RenderError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
            other => CliError::Render {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(te) => CliError::Template(te),
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
