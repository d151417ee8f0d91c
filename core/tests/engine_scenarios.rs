use std::time::{Duration, Instant};

use texflow_core::{Config, FieldRange, Key, KeyEvent, KeyResult, Keymap, Rule, SnippetEngine};

fn engine(rules: Vec<Rule>, force_math: bool) -> SnippetEngine {
    let mut config = Config::default();
    config.set_force_math(force_math);
    SnippetEngine::new(config, rules, Keymap::default())
}

fn lit(trigger: &str, replacement: &str, options: &str) -> Rule {
    Rule::literal(trigger, replacement, options).unwrap()
}

fn type_at(engine: &mut SnippetEngine, s: &str, now: Instant) {
    for c in s.chars() {
        engine.process_key_at(KeyEvent::char(c), now);
    }
}

fn tab(engine: &mut SnippetEngine) -> KeyResult {
    engine.process_key(KeyEvent::plain(Key::Tab))
}

#[test]
fn double_slash_expands_inside_existing_text() {
    let mut e = engine(vec![lit("//", "\\frac{$1}{$2}$0", "mA")], true);
    e.load_text("a / b");
    e.set_selection(3, 3);
    e.process_key(KeyEvent::char('/'));

    assert_eq!(e.text(), "a \\frac{}{} b");
    assert_eq!(e.selection(), FieldRange::caret(8));
    assert_eq!(e.context().fired_rule, Some(0));
    assert_eq!(e.context().pending_fields, 2);

    type_at(&mut e, "x", Instant::now());
    assert_eq!(tab(&mut e), KeyResult::Handled);
    assert_eq!(e.selection(), FieldRange::caret(11));
    type_at(&mut e, "y", Instant::now());
    tab(&mut e);
    assert_eq!(e.text(), "a \\frac{x}{y} b");
    assert_eq!(e.selection(), FieldRange::caret(13));
    assert!(!e.is_snippet_active());
}

#[test]
fn default_field_is_selected_and_replaced_by_typing() {
    let mut e = engine(vec![lit("sum", "\\sum_{${1:i}}^{${2:n}} $0", "mA")], true);
    type_at(&mut e, "sum", Instant::now());
    assert_eq!(e.text(), "\\sum_{i}^{n} ");
    assert_eq!(e.selection(), FieldRange::new(6, 7));

    type_at(&mut e, "k", Instant::now());
    tab(&mut e);
    assert_eq!(e.selection(), FieldRange::new(10, 11));
    type_at(&mut e, "m", Instant::now());
    tab(&mut e);
    assert_eq!(e.text(), "\\sum_{k}^{m} ");
    assert_eq!(e.caret(), 13);
}

#[test]
fn typing_coalesces_history_and_undo_restores() {
    let t0 = Instant::now();
    let mut e = engine(vec![], false);
    e.process_key_at(KeyEvent::char('a'), t0);
    e.process_key_at(KeyEvent::char('b'), t0 + Duration::from_millis(100));
    e.process_key_at(KeyEvent::char('c'), t0 + Duration::from_millis(200));
    assert_eq!(e.session().history().len(), 2);

    e.process_key_at(KeyEvent::char('d'), t0 + Duration::from_secs(2));
    assert_eq!(e.session().history().len(), 3);

    let undo = KeyEvent::char('z').ctrl();
    assert_eq!(e.process_key_at(undo, t0 + Duration::from_secs(3)), KeyResult::Handled);
    assert_eq!(e.text(), "abc");
    assert_eq!(e.context().status_text, "undo");

    e.process_key(undo);
    assert_eq!(e.text(), "");
    assert_eq!(e.process_key(undo), KeyResult::NotHandled);

    let redo = KeyEvent::char('Z').ctrl();
    e.process_key(redo);
    assert_eq!(e.text(), "abc");
}

#[test]
fn undo_drops_active_snippet() {
    let mut e = engine(vec![lit("ff", "\\frac{$1}{$2}$0", "mA")], true);
    type_at(&mut e, "ff", Instant::now());
    assert!(e.is_snippet_active());
    assert!(e.undo());
    assert!(!e.is_snippet_active());
}

#[test]
fn longest_trigger_wins_while_typing() {
    for rules in [
        vec![lit("set", "S", "A"), lit("eset", "E", "A")],
        vec![lit("eset", "E", "A"), lit("set", "S", "A")],
    ] {
        let mut e = engine(rules, false);
        type_at(&mut e, "ese", Instant::now());
        type_at(&mut e, "t", Instant::now());
        assert_eq!(e.text(), "E");
    }
}

#[test]
fn word_boundary_rule_while_typing() {
    let rules = vec![lit("and", "\\land", "wA")];
    let mut e = engine(rules.clone(), false);
    type_at(&mut e, "brand", Instant::now());
    assert_eq!(e.text(), "brand");

    let mut e = engine(rules, false);
    type_at(&mut e, "p and", Instant::now());
    assert_eq!(e.text(), "p \\land");
}

#[test]
fn math_only_rule_waits_for_math() {
    let mut e = engine(vec![lit("sr", "^{2}", "mA")], false);
    type_at(&mut e, "sr ", Instant::now());
    assert_eq!(e.text(), "sr ");
    type_at(&mut e, "$xsr", Instant::now());
    // the '$' pair keeps the caret inside math
    assert_eq!(e.text(), "sr $x^{2}$");
}

#[test]
fn pairs_overtype_and_delete() {
    let mut e = engine(vec![], false);
    type_at(&mut e, "(", Instant::now());
    assert_eq!(e.text(), "()");
    assert_eq!(e.caret(), 1);
    type_at(&mut e, ")", Instant::now());
    assert_eq!(e.text(), "()");
    assert_eq!(e.caret(), 2);

    e.process_key(KeyEvent::plain(Key::Left));
    e.process_key(KeyEvent::plain(Key::Backspace));
    assert_eq!(e.text(), "");
}

#[test]
fn selection_wraps_with_pair_or_surround_rule() {
    let mut e = engine(vec![lit("U", "\\underline{${VISUAL}}$0", "mA")], true);
    e.load_text("a+b");
    e.set_selection(0, 3);
    e.process_key(KeyEvent::char('U'));
    assert_eq!(e.text(), "\\underline{a+b}");
    assert_eq!(e.caret(), 15);

    e.set_selection(11, 14);
    e.process_key(KeyEvent::char('('));
    assert_eq!(e.text(), "\\underline{(a+b)}");
}

#[test]
fn tab_falls_back_to_manual_expand_then_indent() {
    let mut e = engine(vec![lit("beg", "\\begin{$1}\n$0\n\\end{$1}", "")], true);
    type_at(&mut e, "beg", Instant::now());
    assert_eq!(e.text(), "beg");
    tab(&mut e);
    assert_eq!(e.text(), "\\begin{}\n\n\\end{}");
    assert_eq!(e.caret(), 7);

    let mut e = engine(vec![], false);
    type_at(&mut e, "x", Instant::now());
    tab(&mut e);
    assert_eq!(e.text(), "x  ");
}

#[test]
fn tab_steps_over_closing_delimiter() {
    let mut e = engine(vec![], false);
    e.load_text("{a}");
    e.set_selection(2, 2);
    tab(&mut e);
    assert_eq!(e.text(), "{a}");
    assert_eq!(e.caret(), 3);
}

#[test]
fn matrix_rows_and_columns() {
    let mut e = engine(vec![], true);
    e.load_text("\\begin{pmatrix}\n1\n\\end{pmatrix}");
    e.set_selection(17, 17);
    tab(&mut e);
    assert_eq!(e.text(), "\\begin{pmatrix}\n1 & \n\\end{pmatrix}");
    type_at(&mut e, "0", Instant::now());
    e.process_key(KeyEvent::plain(Key::Enter));
    assert_eq!(e.text(), "\\begin{pmatrix}\n1 & 0 \\\\\n\n\\end{pmatrix}");
    assert_eq!(e.caret(), 25);
}

#[test]
fn smart_fraction_wraps_operand() {
    let mut e = engine(vec![], true);
    type_at(&mut e, "x + a^{2}", Instant::now());
    e.process_key(KeyEvent::char('/').alt());
    assert_eq!(e.text(), "x + \\frac{a^{2}}{}");
    assert_eq!(e.caret(), 17);
    assert!(e.is_snippet_active());
}

#[test]
fn line_commands() {
    let mut e = engine(vec![], false);
    e.load_text("one\ntwo\nthree");
    e.set_selection(5, 5);
    e.process_key(KeyEvent::plain(Key::Up).alt());
    assert_eq!(e.text(), "two\none\nthree");

    e.process_key(KeyEvent::char('K').ctrl().shift());
    assert_eq!(e.text(), "one\nthree");

    e.set_selection(9, 9);
    e.process_key(KeyEvent::plain(Key::Backspace).ctrl());
    assert_eq!(e.text(), "one\n");
}

#[test]
fn raw_input_takes_typing_path() {
    let mut e = engine(vec![lit("sr", "^{2}", "mA")], true);
    e.load_text("x");
    assert_eq!(e.handle_input("xsr", 3), KeyResult::Handled);
    assert_eq!(e.text(), "x^{2}");
    assert_eq!(e.handle_input("x^{2}", 5), KeyResult::NotHandled);
}

#[test]
fn custom_keymap_replaces_defaults() {
    let mut keymap = Keymap::empty();
    keymap.bind("Ctrl+Space", texflow_core::EditorAction::NextTabstop).unwrap();
    let mut e = engine(vec![], false);
    e.replace_keymap(keymap);
    type_at(&mut e, "x", Instant::now());
    assert_eq!(e.process_key(KeyEvent::plain(Key::Tab)), KeyResult::NotHandled);
    e.process_key(KeyEvent::char(' ').ctrl());
    assert_eq!(e.text(), "x  ");
}
