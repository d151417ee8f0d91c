//! Trigger matching.
//!
//! Given the text before the caret and the rule table, find the best rule
//! that fires here. Mode gating, word boundaries and ranking are applied on
//! every call; compiled patterns are kept in an LRU cache.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::num::NonZeroUsize;

use regex::Regex;

use crate::fields::FieldRange;
use crate::rule::{Rule, Template, Trigger};
use crate::scan;
use crate::template::{self, Expansion};

/// A rule that fired, already spliced into the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub rule_index: usize,
    /// Range of the original text that was replaced.
    pub span: FieldRange,
    /// Full text after the replacement.
    pub text: String,
    /// Absolute selection to apply.
    pub selection: FieldRange,
    /// Absolute fields still to visit.
    pub fields: Vec<FieldRange>,
}

impl Match {
    /// Splice `expansion` over `span` of `text`, rebasing all ranges.
    pub fn from_expansion(text: &str, span: FieldRange, expansion: Expansion, rule_index: usize) -> Self {
        let (selection, fields) = expansion.rebased(span.start);
        Self {
            rule_index,
            span,
            text: expansion.splice_into(text, span),
            selection,
            fields,
        }
    }
}

/// Rule matcher with a compiled-pattern cache.
pub struct TriggerMatcher {
    /// `None` marks a pattern that failed to compile.
    cache: RefCell<lru::LruCache<String, Option<Regex>>>,
    cache_hits: RefCell<usize>,
    cache_misses: RefCell<usize>,
}

impl TriggerMatcher {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: RefCell::new(lru::LruCache::new(
                NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            cache_hits: RefCell::new(0),
            cache_misses: RefCell::new(0),
        }
    }

    /// Compiled regex for an anchored pattern source, or `None` if broken.
    fn compiled(&self, anchored: &str) -> Option<Regex> {
        if let Some(entry) = self.cache.borrow_mut().get(anchored) {
            *self.cache_hits.borrow_mut() += 1;
            return entry.clone();
        }
        *self.cache_misses.borrow_mut() += 1;

        let compiled = match Regex::new(anchored) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(%err, pattern = anchored, "skipping rule with invalid pattern");
                None
            }
        };
        self.cache.borrow_mut().put(anchored.to_string(), compiled.clone());
        compiled
    }

    /// Find the highest ranked rule that fires at `caret`.
    ///
    /// With `auto_fire_only` only rules carrying the `A` option are
    /// considered; the explicit expand command passes `false`.
    pub fn find(
        &self,
        text: &str,
        caret: usize,
        rules: &[Rule],
        force_math: bool,
        auto_fire_only: bool,
    ) -> Option<Match> {
        let caret = crate::buffer::clamp_to_boundary(text, caret);
        let before = &text[..caret];
        let in_math = force_math || scan::is_inside_math(text, caret);

        for index in ranked(rules, in_math, auto_fire_only) {
            let rule = &rules[index];
            let hit = match &rule.trigger {
                Trigger::Literal(trigger) => {
                    // functions see the trigger as m[0], like a pattern's whole match
                    let captures = match rule.template {
                        Template::Function(_) => vec![trigger.clone()],
                        Template::Text(_) => Vec::new(),
                    };
                    match_literal(before, trigger, rule.options.word_boundary).map(|start| (start, captures))
                }
                Trigger::Pattern(pattern) => {
                    let Some(re) = self.compiled(&pattern.anchored_source()) else {
                        continue;
                    };
                    match_pattern(&re, before, matches!(rule.template, Template::Function(_)))
                }
            };
            let Some((start, captures)) = hit else {
                continue;
            };

            let expansion = template::compile(&rule.template, &captures, "");
            tracing::debug!(rule = index, start, caret, "rule fired");
            return Some(Match::from_expansion(
                text,
                FieldRange::new(start, caret),
                expansion,
                index,
            ));
        }
        None
    }

    /// Surround rule for `typed` when text is selected: a visual rule whose
    /// literal trigger is exactly the typed character.
    pub fn find_visual(&self, rules: &[Rule], typed: char, in_math: bool) -> Option<usize> {
        let mut buf = [0u8; 4];
        let typed: &str = typed.encode_utf8(&mut buf);
        rules.iter().position(|rule| {
            rule.uses_visual()
                && rule.options.allows(in_math)
                && rule.trigger.as_literal() == Some(typed)
        })
    }

    /// Forget every compiled pattern (rules were replaced).
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// (hits, misses) of the pattern cache.
    pub fn cache_stats(&self) -> (usize, usize) {
        (*self.cache_hits.borrow(), *self.cache_misses.borrow())
    }

    pub fn cache_size(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// Eligible rule indices in match order: priority desc, literal length
/// desc, declaration order desc.
pub fn ranked(rules: &[Rule], in_math: bool, auto_fire_only: bool) -> Vec<usize> {
    let mut eligible: Vec<usize> = rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| {
            !rule.uses_visual()
                && (!auto_fire_only || rule.options.auto)
                && rule.options.allows(in_math)
        })
        .map(|(i, _)| i)
        .collect();
    eligible.sort_by_key(|&i| {
        let rule = &rules[i];
        (Reverse(rule.priority), Reverse(rule.trigger.literal_len()), Reverse(i))
    });
    eligible
}

/// Start offset of a literal trigger ending `before`.
fn match_literal(before: &str, trigger: &str, word_boundary: bool) -> Option<usize> {
    if trigger.is_empty() || !before.ends_with(trigger) {
        return None;
    }
    let start = before.len() - trigger.len();
    if word_boundary {
        if let Some(prev) = before[..start].chars().next_back() {
            if prev.is_alphanumeric() {
                return None;
            }
        }
    }
    Some(start)
}

/// Match an anchored pattern against `before`. Returns the match start and
/// the captures the template should see.
fn match_pattern(re: &Regex, before: &str, whole_match_first: bool) -> Option<(usize, Vec<String>)> {
    // `(?m)$` can also stop at an earlier line end
    let caps = re
        .captures_iter(before)
        .find(|caps| caps.get(0).is_some_and(|m| m.end() == before.len()))?;
    let whole = caps.get(0)?;
    // empty matches never fire
    if whole.start() == whole.end() {
        return None;
    }
    let skip = if whole_match_first { 0 } else { 1 };
    let groups = caps
        .iter()
        .skip(skip)
        .map(|group| group.map(|g| g.as_str().to_string()).unwrap_or_default())
        .collect();
    Some((whole.start(), groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CaptureFn;
    use crate::rule::Pattern;

    fn lit(trigger: &str, replacement: &str, options: &str) -> Rule {
        Rule::literal(trigger, replacement, options).unwrap()
    }

    fn pattern(source: &str, replacement: &str, options: &str) -> Rule {
        Rule::new(
            Trigger::Pattern(Pattern::new(source)),
            Template::Text(replacement.to_string()),
            options.parse().unwrap(),
        )
    }

    #[test]
    fn test_literal_fires_and_splices() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("sr", "^{2}", "mA")];
        let hit = m.find("$x sr$", 5, &rules, false, true).unwrap();
        assert_eq!(hit.text, "$x ^{2}$");
        assert_eq!(hit.span, FieldRange::new(3, 5));
        assert_eq!(hit.selection, FieldRange::caret(7));
        assert!(hit.fields.is_empty());
    }

    #[test]
    fn test_math_gate() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("sr", "^{2}", "mA")];
        assert!(m.find("x sr", 4, &rules, false, true).is_none());
        assert!(m.find("x sr", 4, &rules, true, true).is_some());

        let text_rules = vec![lit("mk", "$$0$", "tA")];
        assert!(m.find("$mk", 3, &text_rules, false, true).is_none());
        assert!(m.find("mk", 2, &text_rules, false, true).is_some());
    }

    #[test]
    fn test_auto_fire_only_filters_manual_rules() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("sum", "\\sum", "m")];
        assert!(m.find("sum", 3, &rules, true, true).is_none());
        assert!(m.find("sum", 3, &rules, true, false).is_some());
    }

    #[test]
    fn test_word_boundary() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("and", "\\land", "mwA")];
        assert!(m.find("brand", 5, &rules, true, true).is_none());
        let hit = m.find("x and", 5, &rules, true, true).unwrap();
        assert_eq!(hit.text, "x \\land");
        assert!(m.find("and", 3, &rules, true, true).is_some());
    }

    #[test]
    fn test_priority_and_specificity() {
        let m = TriggerMatcher::new(8);
        for rules in [
            vec![lit("set", "\\{$1\\}", "mA"), lit("eset", "\\emptyset", "mA")],
            vec![lit("eset", "\\emptyset", "mA"), lit("set", "\\{$1\\}", "mA")],
        ] {
            let hit = m.find("eset", 4, &rules, true, true).unwrap();
            assert_eq!(hit.text, "\\emptyset");
        }

        let rules = vec![
            lit("eset", "\\emptyset", "mA"),
            lit("set", "S", "mA").with_priority(1),
        ];
        assert_eq!(m.find("eset", 4, &rules, true, true).unwrap().text, "eS");
    }

    #[test]
    fn test_later_rule_wins_ties() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("ab", "first", "A"), lit("ab", "second", "A")];
        assert_eq!(m.find("ab", 2, &rules, false, true).unwrap().text, "second");
    }

    #[test]
    fn test_pattern_captures_for_text_template() {
        let m = TriggerMatcher::new(8);
        let rules = vec![pattern("([A-Za-z])(\\d)", "[[0]]_{[[1]]}", "mA")];
        let hit = m.find("a x2", 4, &rules, true, true).unwrap();
        assert_eq!(hit.text, "a x_{2}");
        assert_eq!(hit.span, FieldRange::new(2, 4));
    }

    #[test]
    fn test_pattern_captures_for_function_template() {
        let m = TriggerMatcher::new(8);
        let func = CaptureFn::parse("m[0] + \"|\" + m[1]").unwrap();
        let rules = vec![Rule::new(
            Trigger::Pattern(Pattern::new("iden(\\d)")),
            Template::Function(func),
            "mA".parse().unwrap(),
        )];
        assert_eq!(m.find("iden3", 5, &rules, true, true).unwrap().text, "iden3|3");
    }

    #[test]
    fn test_literal_trigger_is_first_capture_for_function_template() {
        let m = TriggerMatcher::new(8);
        let rules = vec![Rule::new(
            Trigger::Literal("idn".into()),
            Template::Function(CaptureFn::parse("m[0] + \"!\"").unwrap()),
            "A".parse().unwrap(),
        )];
        let hit = m.find("x idn", 5, &rules, false, true).unwrap();
        assert_eq!(hit.text, "x idn!");
        assert_eq!(hit.span, FieldRange::new(2, 5));
    }

    #[test]
    fn test_pattern_must_end_at_caret() {
        let m = TriggerMatcher::new(8);
        let rules = vec![Rule::new(
            Trigger::Pattern(Pattern::with_flags("ab", "m")),
            Template::Text("X".into()),
            "A".parse().unwrap(),
        )];
        assert!(m.find("ab\ncd", 5, &rules, false, true).is_none());
        assert!(m.find("cd\nab", 5, &rules, false, true).is_some());
    }

    #[test]
    fn test_broken_pattern_is_skipped_and_cached() {
        let m = TriggerMatcher::new(8);
        let rules = vec![pattern("(unclosed", "X", "A"), lit("ed", "Y", "A")];
        assert_eq!(m.find("unclosed", 8, &rules, false, true).unwrap().text, "unclosY");
        assert_eq!(m.find("unclosed", 8, &rules, false, true).unwrap().text, "unclosY");
        assert_eq!(m.cache_stats(), (1, 1));
        assert_eq!(m.cache_size(), 1);
    }

    #[test]
    fn test_visual_rules_never_fire_on_typing() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("U", "\\underbrace{${VISUAL}}", "mA")];
        assert!(m.find("U", 1, &rules, true, false).is_none());
        assert_eq!(m.find_visual(&rules, 'U', true), Some(0));
        assert_eq!(m.find_visual(&rules, 'U', false), None);
    }

    #[test]
    fn test_caret_mid_text_keeps_suffix() {
        let m = TriggerMatcher::new(8);
        let rules = vec![lit("//", "\\frac{$1}{$2}$0", "mA")];
        let hit = m.find("a // b", 4, &rules, true, true).unwrap();
        assert_eq!(hit.text, "a \\frac{}{} b");
        assert_eq!(hit.selection, FieldRange::caret(8));
        assert_eq!(hit.fields, vec![FieldRange::caret(10), FieldRange::caret(11)]);
    }
}
