//! Tab-stop sequencing for the active snippet.
//!
//! After a rule fires, the remaining fields of its template are queued here
//! as absolute ranges into the live text. Every later mutation must shift the
//! queue (see [`FieldTracker::shift`]) so the ranges keep pointing at the
//! text they were created for.

use std::collections::VecDeque;

use crate::buffer::clamp_to_boundary;
use crate::scan;

/// Half-open `[start, end)` byte range. `start == end` is a pure caret stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldRange {
    pub start: usize,
    pub end: usize,
}

impl FieldRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width range at `pos`.
    pub fn caret(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Translate by `base` (relative → absolute).
    pub fn offset(&self, base: usize) -> Self {
        Self::new(self.start + base, self.end + base)
    }

    /// Clamp both ends into `text` on character boundaries.
    pub fn clamp_to(&self, text: &str) -> Self {
        let start = clamp_to_boundary(text, self.start);
        let end = clamp_to_boundary(text, self.end).max(start);
        Self::new(start, end)
    }
}

/// Outcome of a "next field" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldJump {
    /// Move the selection here.
    Select(FieldRange),
    /// The caret is inside a tabular construct and the next field lies past
    /// its end: insert a column separator instead of jumping.
    ColumnSeparator,
    /// No queued fields.
    Exhausted,
}

/// Ordered queue of pending field ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTracker {
    queue: VecDeque<FieldRange>,
}

impl FieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Next range that `advance` would consider.
    pub fn peek(&self) -> Option<FieldRange> {
        self.queue.front().copied()
    }

    /// Snapshot of the queue in visiting order.
    pub fn ranges(&self) -> Vec<FieldRange> {
        self.queue.iter().copied().collect()
    }

    /// Drop all ranges.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Install a fresh queue (a new snippet replaces the active one).
    pub fn replace(&mut self, ranges: impl IntoIterator<Item = FieldRange>) {
        self.queue = ranges.into_iter().collect();
    }

    /// Shift every range starting at or after `from` by `diff` bytes.
    ///
    /// Ranges whose start would become negative are dropped.
    pub fn shift(&mut self, diff: isize, from: usize) {
        if diff == 0 || self.queue.is_empty() {
            return;
        }
        self.queue = self
            .queue
            .drain(..)
            .filter_map(|range| {
                if range.start < from {
                    return Some(range);
                }
                let start = range.start as isize + diff;
                if start < 0 {
                    return None;
                }
                let end = (range.end as isize + diff).max(start);
                Some(FieldRange::new(start as usize, end as usize))
            })
            .collect();
    }

    /// Drop leading zero-width ranges sitting exactly at `caret`; they were
    /// consumed by the previous jump.
    pub fn skip_consumed(&mut self, caret: usize) {
        while let Some(head) = self.queue.front() {
            if head.is_empty() && head.start == caret {
                self.queue.pop_front();
            } else {
                break;
            }
        }
    }

    /// Pop the next field to visit.
    ///
    /// `tabular` lists the environment names that redirect the jump into a
    /// column separator when the next field lies beyond the enclosing
    /// environment's `\end{..}` tag.
    pub fn advance(&mut self, text: &str, caret: usize, tabular: &[String]) -> FieldJump {
        self.skip_consumed(caret);
        let Some(head) = self.queue.front().copied() else {
            return FieldJump::Exhausted;
        };

        if let Some(env) = scan::enclosing_environment(text, caret, tabular) {
            if let Some(env_end) = scan::find_env_end(text, caret, env) {
                if head.start >= env_end {
                    tracing::debug!(env, "next field lies outside tabular construct");
                    return FieldJump::ColumnSeparator;
                }
            }
        }

        self.queue.pop_front();
        FieldJump::Select(head.clamp_to(text))
    }
}
