use std::time::Instant;

use texflow::{latex_engine, Config, FieldRange, Key, KeyEvent, SnippetEngine};

fn engine(force_math: bool) -> SnippetEngine {
    let mut config = Config::default();
    config.set_force_math(force_math);
    latex_engine(config)
}

fn type_str(engine: &mut SnippetEngine, s: &str) {
    let now = Instant::now();
    for c in s.chars() {
        engine.process_key_at(KeyEvent::char(c), now);
    }
}

#[test]
fn double_slash_makes_a_fraction() {
    let mut e = engine(true);
    type_str(&mut e, "//");
    assert_eq!(e.text(), "\\frac{}{}");
    assert_eq!(e.selection(), FieldRange::caret(6));
    assert_eq!(e.context().pending_fields, 2);
}

#[test]
fn operand_before_slash_becomes_numerator() {
    let mut e = engine(true);
    type_str(&mut e, "a/");
    assert_eq!(e.text(), "\\frac{a}{}");
    assert_eq!(e.caret(), 9);

    let mut e = engine(true);
    type_str(&mut e, "1/");
    assert_eq!(e.text(), "\\frac{1}{}");
}

#[test]
fn greek_names_get_a_backslash_and_a_space() {
    let mut e = engine(true);
    type_str(&mut e, "alpha");
    assert_eq!(e.text(), "\\alpha");
    type_str(&mut e, "b");
    assert_eq!(e.text(), "\\alpha b");
}

#[test]
fn identity_matrix_function_rule() {
    let mut e = engine(true);
    type_str(&mut e, "iden2");
    assert_eq!(e.text(), "\\begin{pmatrix}\n1 & 0 \\\\\n0 & 1\n\\end{pmatrix}");
}

#[test]
fn sum_expands_manually_with_defaults() {
    let mut e = engine(true);
    type_str(&mut e, "sum");
    assert_eq!(e.text(), "\\sum");
    e.process_key(KeyEvent::plain(Key::Tab));
    assert_eq!(e.text(), "\\sum_{i=1}^{N} ");
    assert_eq!(e.selection(), FieldRange::new(6, 7));
}

#[test]
fn math_rules_wait_for_math_mode() {
    let mut e = engine(false);
    type_str(&mut e, "sr ");
    assert_eq!(e.text(), "sr ");

    let mut e = engine(false);
    type_str(&mut e, "mk");
    assert_eq!(e.text(), "$$");
    assert_eq!(e.caret(), 1);
    type_str(&mut e, "xsr");
    assert_eq!(e.text(), "$x^{2}$");
}

#[test]
fn selection_is_wrapped_by_visual_rule() {
    let mut e = engine(true);
    e.load_text("x+1");
    e.set_selection(0, 3);
    e.process_key(KeyEvent::char('S'));
    assert_eq!(e.text(), "\\sqrt{ x+1 }");
}

#[test]
fn taylor_expansion_visits_function_point_and_step() {
    let mut e = engine(true);
    type_str(&mut e, "tayl");
    assert_eq!(
        e.text(),
        "f(x + h) = f(x) + f'(x)h + f''(x) \\frac{h^{2}}{2!} + \\dots"
    );
    assert_eq!(e.selection(), FieldRange::new(0, 1));
    assert_eq!(e.context().pending_fields, 3);

    type_str(&mut e, "g");
    assert!(e.text().starts_with("g(x + h) = f(x)"));
    e.process_key(KeyEvent::plain(Key::Tab));
    assert_eq!(e.selection(), FieldRange::new(2, 3));
    e.process_key(KeyEvent::plain(Key::Tab));
    assert_eq!(e.selection(), FieldRange::new(6, 7));
}
