//! Pure edit handlers.
//!
//! Each handler looks at the buffer (text plus selection) and returns an
//! [`Edit`] describing the new text, the selection to apply and how the
//! pending fields must be updated. Handlers never touch fields or history
//! themselves; the engine applies every `Edit` through one path.

pub mod fraction;
pub mod lines;
pub mod pairs;

pub use fraction::smart_fraction;
pub use lines::{delete_line, delete_word, indent_newline, move_lines, LineDirection};
pub use pairs::PairSet;

use crate::buffer::TextBuffer;
use crate::fields::FieldRange;
use crate::matcher::Match;
use crate::template::Expansion;

/// How an edit affects the pending field queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Shift ranges starting at or after `from` by `diff`.
    Shift { from: usize, diff: isize },
    /// Drop the active snippet.
    Clear,
    /// Start a new snippet with these fields.
    Replace(Vec<FieldRange>),
}

/// A text mutation produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub selection: FieldRange,
    pub field_update: FieldUpdate,
    /// Record a history entry without coalescing.
    pub immediate: bool,
}

impl Edit {
    /// Replace `range` of `text` with `insert`, leaving the caret after it.
    pub fn splice(text: &str, range: FieldRange, insert: &str, immediate: bool) -> Self {
        let mut out = String::with_capacity(text.len() + insert.len());
        out.push_str(&text[..range.start]);
        out.push_str(insert);
        out.push_str(&text[range.end..]);
        let diff = insert.len() as isize - range.len() as isize;
        Self {
            text: out,
            selection: FieldRange::caret(range.start + insert.len()),
            field_update: FieldUpdate::Shift {
                from: range.start,
                diff,
            },
            immediate,
        }
    }

    /// Replace the buffer's selection with `insert`.
    pub fn replace_selection(buffer: &TextBuffer, insert: &str, immediate: bool) -> Self {
        Self::splice(buffer.text(), buffer.selection(), insert, immediate)
    }

    /// Splice a compiled expansion over `span` and start its snippet.
    pub fn expand(text: &str, span: FieldRange, expansion: &Expansion) -> Self {
        let (selection, fields) = expansion.rebased(span.start);
        Self {
            text: expansion.splice_into(text, span),
            selection,
            field_update: FieldUpdate::Replace(fields),
            immediate: true,
        }
    }

    pub fn with_selection(mut self, selection: FieldRange) -> Self {
        self.selection = selection;
        self
    }
}

impl From<Match> for Edit {
    fn from(m: Match) -> Self {
        Self {
            text: m.text,
            selection: m.selection,
            field_update: FieldUpdate::Replace(m.fields),
            immediate: true,
        }
    }
}
