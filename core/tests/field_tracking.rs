use texflow_core::{FieldJump, FieldRange, FieldTracker};

fn tracker(ranges: &[(usize, usize)]) -> FieldTracker {
    let mut t = FieldTracker::new();
    t.replace(ranges.iter().map(|&(s, e)| FieldRange::new(s, e)));
    t
}

fn tabular() -> Vec<String> {
    ["pmatrix", "cases", "align*"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn shifts_compose_like_a_single_pass() {
    let original = [(2, 4), (8, 8), (12, 15)];

    let mut stepwise = tracker(&original);
    stepwise.shift(3, 5);
    // second edit happens after the first one's inserted text
    stepwise.shift(-1, 13);

    let mut direct = tracker(&original);
    direct.replace(original.iter().map(|&(s, e)| {
        let mut start = s as isize;
        let mut end = e as isize;
        if s >= 5 {
            start += 3;
            end += 3;
        }
        if s >= 10 {
            start -= 1;
            end -= 1;
        }
        FieldRange::new(start as usize, end as usize)
    }));

    assert_eq!(stepwise.ranges(), direct.ranges());
}

#[test]
fn deleting_before_fields_pulls_them_back() {
    let mut t = tracker(&[(6, 6), (9, 9)]);
    t.shift(-2, 3);
    assert_eq!(t.ranges(), vec![FieldRange::caret(4), FieldRange::caret(7)]);
}

#[test]
fn sequence_visits_in_order_then_exhausts() {
    let text = "\\frac{a}{b}";
    let mut t = tracker(&[(9, 10), (11, 11)]);
    assert_eq!(t.advance(text, 7, &[]), FieldJump::Select(FieldRange::new(9, 10)));
    assert_eq!(t.advance(text, 10, &[]), FieldJump::Select(FieldRange::caret(11)));
    assert_eq!(t.advance(text, 11, &[]), FieldJump::Exhausted);
}

#[test]
fn consumed_carets_are_dropped() {
    let mut t = tracker(&[(5, 5), (5, 5)]);
    assert_eq!(t.advance("hello", 5, &[]), FieldJump::Exhausted);
    assert!(t.is_empty());
}

#[test]
fn tabular_construct_redirects_to_column_separator() {
    let text = "\\begin{cases}x \\end{cases} y";
    let caret = 15;
    let mut t = tracker(&[(text.len(), text.len())]);
    assert_eq!(t.advance(text, caret, &tabular()), FieldJump::ColumnSeparator);
    assert_eq!(t.len(), 1);
    // outside the construct the same field is a normal jump
    assert_eq!(
        t.advance(text, 27, &tabular()),
        FieldJump::Select(FieldRange::caret(text.len()))
    );
}

#[test]
fn closed_inner_environment_does_not_hide_outer_one() {
    let text = "\\begin{align*}\\begin{pmatrix}1\\end{pmatrix} = x\\end{align*}";
    let caret = text.find(" = x").unwrap() + 4;
    let mut t = tracker(&[(text.len(), text.len())]);
    assert_eq!(t.advance(text, caret, &tabular()), FieldJump::ColumnSeparator);
}
