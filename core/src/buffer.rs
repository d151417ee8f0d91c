//! Text buffer with selection tracking for the snippet editor.
//!
//! The buffer stores the full document text and the current selection. A
//! selection with `start == end` is a plain caret. All offsets are byte
//! offsets that sit on character boundaries.

use crate::fields::FieldRange;

/// Snap `pos` into `text` and down to the nearest character boundary.
pub fn clamp_to_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Byte offset of the character boundary before `pos` (or 0).
pub fn prev_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset of the character boundary after `pos` (or the text length).
pub fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(text.len())
}

/// Document text plus selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    text: String,
    start: usize,
    end: usize,
}

impl TextBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text` with the caret at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            start: end,
            end,
        }
    }

    /// Get the document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Selection as a range (start <= end).
    pub fn selection(&self) -> FieldRange {
        FieldRange::new(self.start, self.end)
    }

    /// The caret position (selection end).
    pub fn caret(&self) -> usize {
        self.end
    }

    /// Whether some text is highlighted.
    pub fn has_selection(&self) -> bool {
        self.start != self.end
    }

    /// The highlighted text (empty for a caret).
    pub fn selected_text(&self) -> &str {
        &self.text[self.start..self.end]
    }

    /// Text before the selection start.
    pub fn before(&self) -> &str {
        &self.text[..self.start]
    }

    /// Text after the selection end.
    pub fn after(&self) -> &str {
        &self.text[self.end..]
    }

    /// Character immediately before the selection start.
    pub fn char_before(&self) -> Option<char> {
        self.before().chars().next_back()
    }

    /// Character immediately after the selection end.
    pub fn char_after(&self) -> Option<char> {
        self.after().chars().next()
    }

    /// Set the selection. Out-of-range offsets are clamped and snapped to
    /// character boundaries; reversed ranges are normalized.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let a = clamp_to_boundary(&self.text, start);
        let b = clamp_to_boundary(&self.text, end);
        self.start = a.min(b);
        self.end = a.max(b);
    }

    /// Collapse the selection into a caret at `pos`.
    pub fn set_caret(&mut self, pos: usize) {
        self.set_selection(pos, pos);
    }

    /// Replace the whole text and set the selection.
    pub fn replace(&mut self, text: impl Into<String>, selection: FieldRange) {
        self.text = text.into();
        self.set_selection(selection.start, selection.end);
    }

    /// Move the caret left by one character, or collapse a selection to its start.
    /// Returns true if anything changed.
    pub fn move_left(&mut self) -> bool {
        if self.has_selection() {
            self.end = self.start;
            return true;
        }
        if self.start == 0 {
            return false;
        }
        let prev = prev_boundary(&self.text, self.start);
        self.set_caret(prev);
        true
    }

    /// Move the caret right by one character, or collapse a selection to its end.
    /// Returns true if anything changed.
    pub fn move_right(&mut self) -> bool {
        if self.has_selection() {
            self.start = self.end;
            return true;
        }
        if self.end >= self.text.len() {
            return false;
        }
        let next = next_boundary(&self.text, self.end);
        self.set_caret(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_text_puts_caret_at_end() {
        let buf = TextBuffer::with_text("abc");
        assert_eq!(buf.caret(), 3);
        assert!(!buf.has_selection());
    }

    #[test]
    fn test_selection_is_clamped_and_normalized() {
        let mut buf = TextBuffer::with_text("héllo");
        buf.set_selection(40, 2);
        // 'é' spans bytes 1..3, so 2 snaps down to 1
        assert_eq!(buf.selection(), FieldRange::new(1, 6));
        assert_eq!(buf.selected_text(), "éllo");
    }

    #[test]
    fn test_move_left_right_over_multibyte() {
        let mut buf = TextBuffer::with_text("aé");
        assert!(buf.move_left());
        assert_eq!(buf.caret(), 1);
        assert!(buf.move_left());
        assert_eq!(buf.caret(), 0);
        assert!(!buf.move_left());
        assert!(buf.move_right());
        assert!(buf.move_right());
        assert_eq!(buf.caret(), 3);
        assert!(!buf.move_right());
    }

    #[test]
    fn test_move_collapses_selection() {
        let mut buf = TextBuffer::with_text("abcdef");
        buf.set_selection(1, 4);
        assert!(buf.move_left());
        assert_eq!(buf.selection(), FieldRange::new(1, 1));
        buf.set_selection(1, 4);
        assert!(buf.move_right());
        assert_eq!(buf.selection(), FieldRange::new(4, 4));
    }

    #[test]
    fn test_neighbour_chars() {
        let mut buf = TextBuffer::with_text("(x)");
        buf.set_caret(2);
        assert_eq!(buf.char_before(), Some('x'));
        assert_eq!(buf.char_after(), Some(')'));
    }
}
