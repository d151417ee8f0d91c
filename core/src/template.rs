//! Replacement template compiler.
//!
//! Turns a raw template plus match captures into clean text and a set of
//! field ranges. Template syntax:
//!
//! - `$n` zero-width field `n` (single digit)
//! - `${n:default}` field `n` pre-filled with `default` (may be empty)
//! - `${VISUAL}` the highlighted text of a surround rule
//! - `[[n]]` capture group `n`
//! - `\$`, `\}`, `\\` escapes; any other backslash is literal
//!
//! Fields are visited `1..=9` in ascending order with `0` as the exit.

use std::collections::BTreeMap;

use crate::fields::FieldRange;
use crate::rule::{Template, VISUAL_PLACEHOLDER};

/// Text emitted in place of a function template that failed to evaluate.
pub const ERROR_MARKER: &str = "ERROR";

/// Result of compiling a template. All ranges are relative to `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    pub fields: BTreeMap<u8, FieldRange>,
    /// Selection to apply right after insertion.
    pub entry: FieldRange,
    /// Fields still to visit after `entry`, in order.
    pub remaining: Vec<FieldRange>,
}

impl Expansion {
    /// `text` with `span` replaced by the expansion.
    pub fn splice_into(&self, text: &str, span: FieldRange) -> String {
        let mut out = String::with_capacity(text.len() + self.text.len());
        out.push_str(&text[..span.start]);
        out.push_str(&self.text);
        out.push_str(&text[span.end..]);
        out
    }

    /// Entry and remaining fields translated to absolute offsets.
    pub fn rebased(&self, base: usize) -> (FieldRange, Vec<FieldRange>) {
        (
            self.entry.offset(base),
            self.remaining.iter().map(|f| f.offset(base)).collect(),
        )
    }
}

/// Compile `template` against `captures` and the `visual` selection.
///
/// Text templates expect captures starting at the first group; function
/// templates receive the whole match at index 0.
pub fn compile(template: &Template, captures: &[String], visual: &str) -> Expansion {
    match template {
        Template::Text(raw) => expand_fields(&substitute(raw, captures, visual)),
        Template::Function(func) => match func.eval(captures) {
            // string literals already resolved their escapes
            Ok(out) => scan_fields(&out, false),
            Err(err) => {
                tracing::warn!(%err, source = func.source(), "function template failed");
                scan_fields(ERROR_MARKER, false)
            }
        },
    }
}

/// Single left-to-right pass replacing `${VISUAL}` and `[[n]]`.
/// Substituted values are not rescanned.
pub fn substitute(raw: &str, captures: &[String], visual: &str) -> String {
    let mut out = String::with_capacity(raw.len() + visual.len());
    let mut rest = raw;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(VISUAL_PLACEHOLDER) {
            out.push_str(visual);
            rest = tail;
            continue;
        }
        if let Some((index, tail)) = capture_ref(rest) {
            if let Some(value) = captures.get(index) {
                out.push_str(value);
                rest = tail;
                continue;
            }
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Parse a leading `[[n]]`, returning the index and the text after it.
fn capture_ref(s: &str) -> Option<(usize, &str)> {
    let body = s.strip_prefix("[[")?;
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let tail = body[digits..].strip_prefix("]]")?;
    let index = body[..digits].parse().ok()?;
    Some((index, tail))
}

fn is_escapable(b: u8) -> bool {
    matches!(b, b'$' | b'}' | b'\\')
}

/// Read a `${n:...}` default starting at `start` (just after the colon).
/// Returns the unescaped default and the offset after the closing brace.
fn read_default(raw: &str, start: usize, escapes: bool) -> Option<(String, usize)> {
    let bytes = raw.as_bytes();
    let mut out = String::new();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) => {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some((out, i + 1)),
            b'}' => depth -= 1,
            _ => {}
        }
        let ch = raw[i..].chars().next()?;
        out.push(ch);
        i += ch.len_utf8();
    }
    None
}

/// Resolve escapes and field markers in already-substituted text.
pub fn expand_fields(raw: &str) -> Expansion {
    scan_fields(raw, true)
}

fn scan_fields(raw: &str, escapes: bool) -> Expansion {
    let bytes = raw.as_bytes();
    let mut text = String::with_capacity(raw.len());
    let mut fields: BTreeMap<u8, FieldRange> = BTreeMap::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) => {
                text.push(bytes[i + 1] as char);
                i += 2;
            }
            b'$' if bytes.get(i + 1) == Some(&b'{')
                && bytes.get(i + 2).is_some_and(u8::is_ascii_digit)
                && bytes.get(i + 3) == Some(&b':') =>
            {
                let id = bytes[i + 2] - b'0';
                match read_default(raw, i + 4, escapes) {
                    Some((default, next)) => {
                        let start = text.len();
                        text.push_str(&default);
                        fields.entry(id).or_insert(FieldRange::new(start, text.len()));
                        i = next;
                    }
                    None => {
                        // unterminated: the rest is plain text
                        text.push_str(&raw[i..]);
                        i = bytes.len();
                    }
                }
            }
            b'$' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                let id = bytes[i + 1] - b'0';
                fields.entry(id).or_insert(FieldRange::caret(text.len()));
                i += 2;
            }
            _ => {
                let Some(ch) = raw[i..].chars().next() else {
                    break;
                };
                text.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    let end = FieldRange::caret(text.len());
    let exit = fields.get(&0).copied();
    let mut ordered = fields.range(1..).map(|(_, range)| *range);
    let (entry, remaining) = match ordered.next() {
        Some(first) => {
            let mut rest: Vec<FieldRange> = ordered.collect();
            rest.push(exit.unwrap_or(end));
            (first, rest)
        }
        None => (exit.unwrap_or(end), Vec::new()),
    };

    Expansion {
        text,
        fields,
        entry,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CaptureFn;

    fn text(raw: &str) -> Expansion {
        compile(&Template::Text(raw.to_string()), &[], "")
    }

    #[test]
    fn test_plain_text_round_trip() {
        let exp = text("\\alpha + b");
        assert_eq!(exp.text, "\\alpha + b");
        assert_eq!(exp.entry, FieldRange::caret(exp.text.len()));
        assert!(exp.remaining.is_empty());
        assert!(exp.fields.is_empty());
    }

    #[test]
    fn test_escapes_resolved() {
        let exp = text("\\$5 \\} \\\\");
        assert_eq!(exp.text, "$5 } \\");
        assert!(exp.fields.is_empty());
    }

    #[test]
    fn test_frac_sequence() {
        let exp = text("\\frac{$1}{$2}$0");
        assert_eq!(exp.text, "\\frac{}{}");
        assert_eq!(exp.entry, FieldRange::caret(6));
        assert_eq!(exp.remaining, vec![FieldRange::caret(8), FieldRange::caret(9)]);
    }

    #[test]
    fn test_one_and_zero_only() {
        let exp = text("\\sqrt{$1}$0");
        assert_eq!(exp.entry, FieldRange::caret(6));
        assert_eq!(exp.remaining, vec![FieldRange::caret(7)]);
    }

    #[test]
    fn test_implicit_exit_when_no_zero() {
        let exp = text("^{$1}");
        assert_eq!(exp.entry, FieldRange::caret(2));
        assert_eq!(exp.remaining, vec![FieldRange::caret(3)]);
    }

    #[test]
    fn test_only_zero_is_entry() {
        let exp = text("\\cdot $0 x");
        assert_eq!(exp.entry, FieldRange::caret(6));
        assert!(exp.remaining.is_empty());
    }

    #[test]
    fn test_default_field_and_nested_braces() {
        let exp = text("\\sum_{${1:i=1}}^{${2:{n}}} ${3:}$0");
        assert_eq!(exp.text, "\\sum_{i=1}^{{n}} ");
        assert_eq!(exp.fields[&1], FieldRange::new(6, 9));
        assert_eq!(exp.fields[&2], FieldRange::new(12, 15));
        assert_eq!(exp.fields[&3], FieldRange::caret(17));

        let exp = text("${1:f{x}}");
        assert_eq!(exp.text, "f{x}");
        assert_eq!(exp.entry, FieldRange::new(0, 4));
    }

    #[test]
    fn test_unterminated_default_is_literal() {
        let exp = text("a${1:open");
        assert_eq!(exp.text, "a${1:open");
        assert!(exp.fields.is_empty());
    }

    #[test]
    fn test_mirrored_id_first_wins() {
        let exp = text("\\begin{${1:env}}\n$2\n\\end{${1:env}}");
        assert_eq!(exp.text, "\\begin{env}\n\n\\end{env}");
        assert_eq!(exp.fields[&1], FieldRange::new(7, 10));
        assert_eq!(exp.fields.len(), 2);
    }

    #[test]
    fn test_visual_and_captures_are_not_rescanned() {
        let caps = vec!["$1".to_string(), "b".to_string()];
        let exp = compile(
            &Template::Text("[[0]]:[[1]]:[[7]]:${VISUAL}".to_string()),
            &caps,
            "${2:x}",
        );
        assert_eq!(substitute("[[0]]:[[1]]:[[7]]:${VISUAL}", &caps, "${2:x}"), "$1:b:[[7]]:${2:x}");
        // the substituted markers still become fields in the field scan
        assert_eq!(exp.text, ":b:[[7]]:x");
    }

    #[test]
    fn test_function_template() {
        let func = CaptureFn::parse("\"x_{\" + m[1] + \"}$0\"").unwrap();
        let caps = vec!["x3".to_string(), "3".to_string()];
        let exp = compile(&Template::Function(func), &caps, "");
        assert_eq!(exp.text, "x_{3}");
        assert_eq!(exp.entry, FieldRange::caret(5));
    }

    #[test]
    fn test_function_error_marker() {
        let func = CaptureFn::parse("1 / 0").unwrap();
        let exp = compile(&Template::Function(func), &[], "");
        assert_eq!(exp.text, ERROR_MARKER);
    }

    #[test]
    fn test_function_output_keeps_backslashes() {
        let func = CaptureFn::parse("matrix(2, 2, \"1\", \"0\") + \"$0\"").unwrap();
        let exp = compile(&Template::Function(func), &[], "");
        assert_eq!(exp.text, "1 & 0 \\\\\n0 & 1");
        assert_eq!(exp.entry, FieldRange::caret(exp.text.len()));
    }

    #[test]
    fn test_multibyte_text_offsets() {
        let exp = text("é${1:ü}$0");
        assert_eq!(exp.text, "éü");
        assert_eq!(exp.entry, FieldRange::new(2, 4));
        assert_eq!(exp.remaining, vec![FieldRange::caret(4)]);
    }
}
