//! Smart fraction: wrap the selection, or the operand before the caret,
//! as the numerator of a fraction template.

use super::Edit;
use crate::buffer::TextBuffer;
use crate::fields::FieldRange;
use crate::rule::Template;
use crate::scan;
use crate::template;

/// Build the fraction edit. `fraction_template` receives the numerator
/// through `${VISUAL}`. Returns `None` when there is nothing to wrap.
pub fn smart_fraction(buffer: &TextBuffer, fraction_template: &str) -> Option<Edit> {
    let text = buffer.text();
    let span = if buffer.has_selection() {
        buffer.selection()
    } else {
        let caret = buffer.caret();
        let start = scan::fraction_operand_start(text, caret);
        if start == caret {
            return None;
        }
        FieldRange::new(start, caret)
    };

    let numerator = &text[span.start..span.end];
    let expansion = template::compile(
        &Template::Text(fraction_template.to_string()),
        &[],
        numerator,
    );
    tracing::debug!(numerator, "smart fraction");
    Some(Edit::expand(text, span, &expansion))
}
