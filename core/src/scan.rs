//! Character-scanning heuristics over raw LaTeX text.
//!
//! None of these parse LaTeX. They are small state machines over the
//! character stream and share its blind spots: `$$` counts as two dollar
//! signs, verbatim blocks are not recognized, and so on.

/// True when an odd number of unescaped `$` precede `caret`.
pub fn is_inside_math(text: &str, caret: usize) -> bool {
    let caret = crate::buffer::clamp_to_boundary(text, caret);
    let mut dollars = 0usize;
    let mut escaped = false;
    for ch in text[..caret].chars() {
        if ch == '\\' {
            escaped = !escaped;
            continue;
        }
        if ch == '$' && !escaped {
            dollars += 1;
        }
        escaped = false;
    }
    dollars % 2 == 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Begin,
    End,
}

/// Collect `\begin{name}` / `\end{name}` tags in order of appearance.
fn environment_tags(text: &str) -> Vec<(TagKind, &str)> {
    let mut tags = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find('\\') {
        let after = &rest[idx + 1..];
        let (kind, body) = if let Some(body) = after.strip_prefix("begin{") {
            (TagKind::Begin, body)
        } else if let Some(body) = after.strip_prefix("end{") {
            (TagKind::End, body)
        } else {
            rest = after;
            continue;
        };
        let name_len = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '*'))
            .unwrap_or(body.len());
        if name_len > 0 && body[name_len..].starts_with('}') {
            tags.push((kind, &body[..name_len]));
            rest = &body[name_len + 1..];
        } else {
            rest = body;
        }
    }
    tags
}

/// Name of the innermost unclosed environment before `caret`, if it is one
/// of the `tabular` environments.
pub fn enclosing_environment<'a>(text: &str, caret: usize, tabular: &'a [String]) -> Option<&'a str> {
    let caret = crate::buffer::clamp_to_boundary(text, caret);
    let tags = environment_tags(&text[..caret]);
    let mut closed: Vec<&str> = Vec::new();
    for &(kind, name) in tags.iter().rev() {
        match kind {
            TagKind::End => closed.push(name),
            TagKind::Begin => {
                if closed.last() == Some(&name) {
                    closed.pop();
                    continue;
                }
                // innermost open environment decides
                return tabular.iter().find(|env| env.as_str() == name).map(|env| env.as_str());
            }
        }
    }
    None
}

/// Offset of the first `\end{env}` at or after `caret`.
pub fn find_env_end(text: &str, caret: usize, env: &str) -> Option<usize> {
    let caret = crate::buffer::clamp_to_boundary(text, caret);
    let tag = format!("\\end{{{env}}}");
    text[caret..].find(&tag).map(|idx| caret + idx)
}

/// Commands that terminate an implicit fraction operand.
const HARD_STOPS: &[&str] = &[
    "approx", "cap", "cdot", "cong", "cup", "div", "equiv", "ge", "geq", "gets", "gg", "iff",
    "impliedby", "implies", "in", "land", "le", "leftarrow", "leftrightarrow", "leq", "ll",
    "lor", "mapsto", "mid", "mp", "ne", "neq", "ni", "notin", "odot", "oplus", "otimes", "pm",
    "propto", "qquad", "quad", "rightarrow", "setminus", "sim", "simeq", "subset", "subseteq",
    "supset", "supseteq", "times", "to", "vee", "wedge",
];

fn is_operand_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '^' | '\'' | '.')
}

fn opener_for(close: char) -> Option<char> {
    match close {
        ')' => Some('('),
        ']' => Some('['),
        '}' => Some('{'),
        _ => None,
    }
}

/// Index in `chars` of the opener matching the closer at `close_idx`.
fn matching_open(chars: &[(usize, char)], close_idx: usize) -> Option<usize> {
    let close = chars[close_idx].1;
    let open = opener_for(close)?;
    let mut depth = 1usize;
    for k in (0..close_idx).rev() {
        let c = chars[k].1;
        if c == close {
            depth += 1;
        } else if c == open {
            depth -= 1;
            if depth == 0 {
                return Some(k);
            }
        }
    }
    None
}

/// Start of the operand that ends at `caret`, found by scanning backward.
///
/// Balanced bracket groups are consumed whole, as are runs of word
/// characters, `^`, `_`, primes and command names. Whitespace, operator
/// symbols and relation commands (see `HARD_STOPS`) end the scan. Returns
/// `caret` when there is nothing to take.
pub fn fraction_operand_start(text: &str, caret: usize) -> usize {
    let caret = crate::buffer::clamp_to_boundary(text, caret);
    let chars: Vec<(usize, char)> = text[..caret].char_indices().collect();
    let mut j = chars.len();

    while j > 0 {
        let ch = chars[j - 1].1;
        if opener_for(ch).is_some() {
            match matching_open(&chars, j - 1) {
                Some(k) => {
                    j = k;
                    continue;
                }
                None => break,
            }
        }
        if !is_operand_char(ch) {
            break;
        }

        let mut k = j - 1;
        while k > 0 && is_operand_char(chars[k - 1].1) {
            k -= 1;
        }
        if k > 0 && chars[k - 1].1 == '\\' {
            let name_len = chars[k..j]
                .iter()
                .take_while(|(_, c)| c.is_ascii_alphabetic())
                .count();
            let name: String = chars[k..k + name_len].iter().map(|&(_, c)| c).collect();
            if HARD_STOPS.contains(&name.as_str()) {
                j = k + name_len;
                break;
            }
            j = k - 1;
        } else {
            j = k;
        }
    }

    chars.get(j).map(|&(pos, _)| pos).unwrap_or(caret)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Other,
}

fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Space
    } else if ch.is_ascii_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

/// Start of the run (whitespace, word, or other symbols) that ends at `caret`.
pub fn word_run_start(text: &str, caret: usize) -> usize {
    let caret = crate::buffer::clamp_to_boundary(text, caret);
    let mut iter = text[..caret].char_indices().rev();
    let Some((mut start, first)) = iter.next() else {
        return caret;
    };
    let class = classify(first);
    for (pos, ch) in iter {
        if classify(ch) != class {
            break;
        }
        start = pos;
    }
    start
}

/// Byte range `[start, end)` of the line containing `pos`, excluding the
/// trailing newline.
pub fn line_bounds(text: &str, pos: usize) -> (usize, usize) {
    let pos = crate::buffer::clamp_to_boundary(text, pos);
    let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len());
    (start, end)
}

/// Leading spaces and tabs of `line`.
pub fn leading_whitespace(line: &str) -> &str {
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}
