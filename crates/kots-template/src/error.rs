//! Template evaluation errors

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template error")]
    Template(#[from] TemplateError),

    #[error("Template output is not valid UTF-8 in {path}")]
    NotUtf8 { path: String },
}

/// Template failure with the offending source attached
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(kots::template::render))]
pub struct TemplateError {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
    ) -> Self {
        let span = err
            .line()
            .and_then(|line_num| calculate_span(template_source, line_num));

        let suggestion = match err.kind() {
            minijinja::ErrorKind::UnknownFunction => Some(format!(
                "Available functions: {}",
                crate::engine::FUNCTION_NAMES.join(", ")
            )),
            minijinja::ErrorKind::UndefinedError => Some(
                "Upstream templates are evaluated without values; only functions are available"
                    .to_string(),
            ),
            _ => None,
        };

        let message = match err.detail() {
            Some(detail) => format!("{}: {}", template_name, detail),
            None => format!("{}: {}", template_name, err),
        };

        Self {
            message,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }
}

/// Span covering the whole of line `line_num` (1-based)
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let source = "a: 1\nb: {{ oops }}\nc: 3";
        let span = calculate_span(source, 2).unwrap();
        assert_eq!(span.offset(), 5);
        assert_eq!(span.len(), 13);
        assert!(calculate_span(source, 9).is_none());
    }
}
