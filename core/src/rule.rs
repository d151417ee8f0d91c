//! Snippet rules: what fires (trigger), what it produces (template) and
//! when it is allowed to fire (options).

use std::fmt;
use std::str::FromStr;

use crate::expr::CaptureFn;

/// Placeholder replaced by the highlighted text in surround rules.
pub const VISUAL_PLACEHOLDER: &str = "${VISUAL}";

/// A pattern trigger. `flags` keeps the letters the rule was written with;
/// only `i`, `m`, `s` and `x` change matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: String::new(),
        }
    }

    pub fn with_flags(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// Full regex source anchored at the end of the haystack.
    pub fn anchored_source(&self) -> String {
        let inline: String = self
            .flags
            .chars()
            .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
            .collect();
        if inline.is_empty() {
            format!("(?:{})$", self.source)
        } else {
            format!("(?{inline})(?:{})$", self.source)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Literal(String),
    Pattern(Pattern),
}

impl Trigger {
    /// Length used for specificity ranking. Patterns rank as zero.
    pub fn literal_len(&self) -> usize {
        match self {
            Trigger::Literal(s) => s.chars().count(),
            Trigger::Pattern(_) => 0,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Trigger::Literal(s) => Some(s),
            Trigger::Pattern(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// Marker text: `$n`, `${n:default}`, `${VISUAL}`, `[[n]]`.
    Text(String),
    /// Capture expression evaluated against the match groups.
    Function(CaptureFn),
}

/// Unknown option letter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule option '{0}'")]
pub struct UnknownOption(pub char);

/// Option flags of a rule, written as a string of letters (`"mA"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleOptions {
    /// `m`: fires only inside math.
    pub math: bool,
    /// `t` (or `n`): fires only outside math.
    pub text: bool,
    /// `w`: literal trigger must start at a word boundary.
    pub word_boundary: bool,
    /// `A`: fires while typing.
    pub auto: bool,
    /// `r`: literal trigger is a pattern.
    pub regex: bool,
    /// `M`: multi-line tag; informational only.
    pub multiline: bool,
}

impl RuleOptions {
    /// Whether the math/text gate lets this rule through.
    pub fn allows(&self, in_math: bool) -> bool {
        !((self.math && !in_math) || (self.text && in_math))
    }
}

impl FromStr for RuleOptions {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut opts = RuleOptions::default();
        for ch in s.chars() {
            match ch {
                'm' => opts.math = true,
                't' | 'n' => opts.text = true,
                'w' => opts.word_boundary = true,
                'A' => opts.auto = true,
                'r' => opts.regex = true,
                'M' => opts.multiline = true,
                other => return Err(UnknownOption(other)),
            }
        }
        Ok(opts)
    }
}

impl fmt::Display for RuleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = [
            (self.math, 'm'),
            (self.text, 't'),
            (self.word_boundary, 'w'),
            (self.regex, 'r'),
            (self.auto, 'A'),
            (self.multiline, 'M'),
        ];
        for (set, letter) in letters {
            if set {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// A single snippet rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub trigger: Trigger,
    pub template: Template,
    pub options: RuleOptions,
    pub priority: i32,
    pub description: String,
}

impl Rule {
    /// Build a rule. A literal trigger with the `r` option becomes a pattern.
    pub fn new(trigger: Trigger, template: Template, options: RuleOptions) -> Self {
        let trigger = match trigger {
            Trigger::Literal(source) if options.regex => Trigger::Pattern(Pattern::new(source)),
            other => other,
        };
        Self {
            trigger,
            template,
            options,
            priority: 0,
            description: String::new(),
        }
    }

    /// Convenience constructor for the common literal + text case.
    pub fn literal(trigger: &str, replacement: &str, options: &str) -> Result<Self, UnknownOption> {
        Ok(Self::new(
            Trigger::Literal(trigger.to_string()),
            Template::Text(replacement.to_string()),
            options.parse()?,
        ))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Surround rules reference `${VISUAL}` and only fire on a selection.
    pub fn uses_visual(&self) -> bool {
        match &self.template {
            Template::Text(text) => text.contains(VISUAL_PLACEHOLDER),
            Template::Function(_) => false,
        }
    }
}
