//! Source preview.
//!
//! No typesetter is bundled. `SourceRenderer` checks that braces and
//! `\left`/`\right` pairs balance and wraps the source in the delimiters a
//! typesetter would receive, so callers exercise the same fallback path a
//! real renderer would trigger.

use texflow_core::{RenderError, Renderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRenderer;

impl Renderer for SourceRenderer {
    fn render(&self, source: &str, display: bool) -> Result<String, RenderError> {
        check_balance(source)?;
        Ok(if display {
            format!("\\[{source}\\]")
        } else {
            format!("\\({source}\\)")
        })
    }
}

fn check_balance(source: &str) -> Result<(), RenderError> {
    let mut braces: Vec<usize> = Vec::new();
    let mut lefts: Vec<usize> = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => {
                let rest = &source[pos + 1..];
                if rest.starts_with("left") && !continues_word(rest, 4) {
                    lefts.push(pos);
                } else if rest.starts_with("right") && !continues_word(rest, 5) {
                    if lefts.pop().is_none() {
                        return Err(RenderError::Parse {
                            pos,
                            message: "\\right without matching \\left".to_string(),
                        });
                    }
                }
                // the escaped character never counts as a brace
                chars.next();
            }
            '{' => braces.push(pos),
            '}' => {
                if braces.pop().is_none() {
                    return Err(RenderError::Parse {
                        pos,
                        message: "unexpected '}'".to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    if let Some(pos) = braces.pop() {
        return Err(RenderError::Parse {
            pos,
            message: "unclosed '{'".to_string(),
        });
    }
    if let Some(pos) = lefts.pop() {
        return Err(RenderError::Parse {
            pos,
            message: "\\left without matching \\right".to_string(),
        });
    }
    Ok(())
}

fn continues_word(rest: &str, len: usize) -> bool {
    rest[len..].starts_with(|c: char| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use texflow_core::render::render_or_fallback;

    #[test]
    fn test_balanced_source_is_wrapped() {
        assert_eq!(SourceRenderer.render("\\frac{a}{b}", false).unwrap(), "\\(\\frac{a}{b}\\)");
        assert_eq!(SourceRenderer.render("x", true).unwrap(), "\\[x\\]");
        assert!(SourceRenderer.render("\\{ a \\}", false).is_ok());
        assert!(SourceRenderer.render("\\left( x \\right)", false).is_ok());
        assert!(SourceRenderer.render("\\leftarrow \\rightarrow", false).is_ok());
    }

    #[test]
    fn test_unbalanced_source_reports_position() {
        assert_eq!(
            SourceRenderer.render("\\frac{a}{b", false),
            Err(RenderError::Parse {
                pos: 8,
                message: "unclosed '{'".to_string()
            })
        );
        assert!(matches!(
            SourceRenderer.render("a}", false),
            Err(RenderError::Parse { pos: 1, .. })
        ));
        assert!(SourceRenderer.render("\\left( x", false).is_err());
    }

    #[test]
    fn test_fallback_shows_raw_source() {
        let r = render_or_fallback(&SourceRenderer, "\\sqrt{x", false);
        assert!(r.is_fallback());
        assert_eq!(r.output(), "\\sqrt{x");
    }
}
