//! Auto-pairing, overtype and pair deletion.

use super::Edit;
use crate::buffer::TextBuffer;
use crate::fields::FieldRange;

/// Configured opener/closer pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PairSet {
    pairs: Vec<(char, char)>,
}

impl PairSet {
    /// Build from two-character strings like `"()"`. Malformed entries are
    /// skipped with a warning.
    pub fn from_config(entries: &[String]) -> Self {
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut chars = entry.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(open), Some(close), None) => pairs.push((open, close)),
                _ => tracing::warn!(pair = %entry, "ignoring auto pair that is not two characters"),
            }
        }
        Self { pairs }
    }

    pub fn closer_for(&self, open: char) -> Option<char> {
        self.pairs.iter().find(|(o, _)| *o == open).map(|(_, c)| *c)
    }

    pub fn is_closer(&self, ch: char) -> bool {
        self.pairs.iter().any(|(_, c)| *c == ch)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Caret position after stepping over `typed` when it matches the closer
/// right after a bare caret.
pub fn overtype(buffer: &TextBuffer, pairs: &PairSet, typed: char) -> Option<usize> {
    if buffer.has_selection() || !pairs.is_closer(typed) {
        return None;
    }
    (buffer.char_after() == Some(typed)).then(|| buffer.caret() + typed.len_utf8())
}

/// Insert `open` and its closer, wrapping the selection if there is one.
/// The caret lands before the closer.
pub fn insert_pair(buffer: &TextBuffer, pairs: &PairSet, open: char) -> Option<Edit> {
    let close = pairs.closer_for(open)?;
    let selected = buffer.selected_text();
    let wrapped = format!("{open}{selected}{close}");
    let caret = buffer.selection().start + open.len_utf8() + selected.len();
    Some(Edit::replace_selection(buffer, &wrapped, true).with_selection(FieldRange::caret(caret)))
}

/// Delete an empty pair around the caret (`(|)` → `|`).
pub fn delete_pair(buffer: &TextBuffer, pairs: &PairSet) -> Option<Edit> {
    if buffer.has_selection() {
        return None;
    }
    let open = buffer.char_before()?;
    let close = buffer.char_after()?;
    if pairs.closer_for(open) != Some(close) {
        return None;
    }
    let caret = buffer.caret();
    let range = FieldRange::new(caret - open.len_utf8(), caret + close.len_utf8());
    Some(Edit::splice(buffer.text(), range, "", true))
}
