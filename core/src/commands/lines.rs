//! Line- and word-oriented edits: word deletion, line deletion, line
//! reordering and newline indentation.

use super::{Edit, FieldUpdate};
use crate::buffer::TextBuffer;
use crate::fields::FieldRange;
use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Up,
    Down,
}

/// Delete the selection, or the run of whitespace / word characters /
/// other symbols before the caret.
pub fn delete_word(buffer: &TextBuffer) -> Option<Edit> {
    if buffer.has_selection() {
        return Some(Edit::replace_selection(buffer, "", true));
    }
    let caret = buffer.caret();
    if caret == 0 {
        return None;
    }
    let start = scan::word_run_start(buffer.text(), caret);
    Some(Edit::splice(buffer.text(), FieldRange::new(start, caret), "", true))
}

/// Indices of the first and last line touched by the selection. A
/// selection ending right after a newline does not include the next line.
fn selected_lines(buffer: &TextBuffer) -> (usize, usize) {
    let text = buffer.text();
    let sel = buffer.selection();
    let first = text[..sel.start].matches('\n').count();
    let mut last = text[..sel.end].matches('\n').count();
    if sel.end > sel.start && text[..sel.end].ends_with('\n') {
        last -= 1;
    }
    (first, last.max(first))
}

/// Remove every line the selection touches, including one line break.
pub fn delete_line(buffer: &TextBuffer) -> Option<Edit> {
    let text = buffer.text();
    if text.is_empty() {
        return None;
    }
    let sel = buffer.selection();
    let (start, _) = scan::line_bounds(text, sel.start);
    let last_pos = if sel.end > sel.start && text[..sel.end].ends_with('\n') {
        sel.end - 1
    } else {
        sel.end
    };
    let (_, end) = scan::line_bounds(text, last_pos);
    let range = if end < text.len() {
        FieldRange::new(start, end + 1)
    } else if start > 0 {
        FieldRange::new(start - 1, end)
    } else {
        FieldRange::new(start, end)
    };
    Some(Edit::splice(text, range, "", true))
}

/// Swap the selected lines with the line above or below. The selection
/// moves with the lines; the active snippet is dropped.
pub fn move_lines(buffer: &TextBuffer, direction: LineDirection) -> Option<Edit> {
    let text = buffer.text();
    let sel = buffer.selection();
    let mut lines: Vec<&str> = text.split('\n').collect();
    let (first, last) = selected_lines(buffer);

    let shift: isize = match direction {
        LineDirection::Up => {
            if first == 0 {
                return None;
            }
            let above = lines.remove(first - 1);
            lines.insert(last, above);
            -(above.len() as isize + 1)
        }
        LineDirection::Down => {
            if last + 1 >= lines.len() {
                return None;
            }
            let below = lines.remove(last + 1);
            lines.insert(first, below);
            below.len() as isize + 1
        }
    };

    let text = lines.join("\n");
    let moved = |pos: usize| ((pos as isize + shift).max(0) as usize).min(text.len());
    Some(Edit {
        selection: FieldRange::new(moved(sel.start), moved(sel.end)),
        text,
        field_update: FieldUpdate::Clear,
        immediate: true,
    })
}

/// Newline that keeps the current line's indentation. Inside a tabular
/// construct a row terminator is added first unless the line is empty, is
/// a `\begin`/`\end` line or already ends with a backslash.
pub fn indent_newline(buffer: &TextBuffer, in_tabular: bool, row_terminator: &str) -> Edit {
    let text = buffer.text();
    let start = buffer.selection().start;
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..start];
    let indent = scan::leading_whitespace(line);

    let trimmed = line.trim();
    let terminate = in_tabular
        && !trimmed.is_empty()
        && !trimmed.starts_with("\\begin")
        && !trimmed.starts_with("\\end")
        && !trimmed.ends_with('\\');

    let insert = if terminate {
        format!("{row_terminator}\n{indent}")
    } else {
        format!("\n{indent}")
    };
    Edit::replace_selection(buffer, &insert, true)
}
