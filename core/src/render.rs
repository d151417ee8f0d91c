//! Renderer contract.
//!
//! Typesetting is done by an external collaborator. The engine only needs
//! to know that rendering may fail, in which case the raw source is shown
//! together with the failure message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Converts LaTeX source into displayable markup.
pub trait Renderer {
    /// `display` selects display (block) style instead of inline.
    fn render(&self, source: &str, display: bool) -> Result<String, RenderError>;
}

/// Outcome of a render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    Rendered(String),
    Fallback { raw: String, message: String },
}

impl Rendering {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Rendering::Fallback { .. })
    }

    /// The markup or the raw source, whichever is available.
    pub fn output(&self) -> &str {
        match self {
            Rendering::Rendered(out) => out,
            Rendering::Fallback { raw, .. } => raw,
        }
    }
}

/// Render `source`, degrading to the raw text on failure.
pub fn render_or_fallback<R: Renderer + ?Sized>(renderer: &R, source: &str, display: bool) -> Rendering {
    match renderer.render(source, display) {
        Ok(out) => Rendering::Rendered(out),
        Err(err) => {
            tracing::debug!(%err, "render failed, showing raw source");
            Rendering::Fallback {
                raw: source.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Renderer for Failing {
        fn render(&self, _source: &str, _display: bool) -> Result<String, RenderError> {
            Err(RenderError::Unavailable("offline".into()))
        }
    }

    struct Upper;

    impl Renderer for Upper {
        fn render(&self, source: &str, _display: bool) -> Result<String, RenderError> {
            Ok(source.to_uppercase())
        }
    }

    #[test]
    fn test_fallback_keeps_raw_source() {
        let r = render_or_fallback(&Failing, "\\frac{a}{b}", false);
        assert!(r.is_fallback());
        assert_eq!(r.output(), "\\frac{a}{b}");
        assert_eq!(
            r,
            Rendering::Fallback {
                raw: "\\frac{a}{b}".into(),
                message: "renderer unavailable: offline".into()
            }
        );
    }

    #[test]
    fn test_success_passes_through() {
        let r = render_or_fallback(&Upper, "x", true);
        assert_eq!(r, Rendering::Rendered("X".into()));
    }
}
