//! Declarative rule source (TOML).
//!
//! ```toml
//! [variables]
//! GREEK = "alpha|beta|gamma"
//!
//! [[rule]]
//! trigger = "//"
//! replacement = '\frac{$1}{$2}$0'
//! options = "mA"
//!
//! [[rule]]
//! pattern = '([A-Za-z])(\d)'
//! replacement = '[[0]]_{[[1]]}'
//! options = "mA"
//! priority = -1
//! ```
//!
//! Every rule needs exactly one of `trigger` / `pattern` and exactly one of
//! `replacement` / `function`. `${NAME}` inside triggers and patterns is
//! replaced from the variables table before the rule is stored, so parsed
//! rules are self-contained.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{CaptureFn, ExprError};
use crate::rule::{Pattern, Rule, RuleOptions, Template, Trigger, UnknownOption};

#[derive(Debug, Error)]
pub enum RuleSourceError {
    #[error("rule source is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("rule {index}: {message}")]
    Shape { index: usize, message: String },
    #[error("rule {index}: {source}")]
    Options { index: usize, source: UnknownOption },
    #[error("rule {index}: invalid pattern: {source}")]
    Pattern { index: usize, source: regex::Error },
    #[error("rule {index}: invalid function: {source}")]
    Function { index: usize, source: ExprError },
    #[error("cannot serialize rules: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    variables: BTreeMap<String, String>,
    #[serde(default, rename = "rule")]
    rules: Vec<RawRule>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    flags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    options: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    priority: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

/// Replace `${NAME}` placeholders with entries of `variables`. Unknown
/// names are left untouched.
pub fn expand_variables(input: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find("${") {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 2..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        let is_name = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
        match variables.get(name) {
            Some(value) if is_name && after[name_len..].starts_with('}') => {
                out.push_str(value);
                rest = &after[name_len + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn build_rule(index: usize, raw: RawRule, variables: &HashMap<String, String>) -> Result<Rule, RuleSourceError> {
    let shape = |message: &str| RuleSourceError::Shape {
        index,
        message: message.to_string(),
    };
    let options: RuleOptions = raw
        .options
        .parse()
        .map_err(|source| RuleSourceError::Options { index, source })?;

    let trigger = match (raw.trigger, raw.pattern) {
        (Some(trigger), None) => {
            let trigger = expand_variables(&trigger, variables);
            if options.regex {
                Trigger::Pattern(Pattern::with_flags(trigger, raw.flags))
            } else if !raw.flags.is_empty() {
                return Err(shape("`flags` needs a pattern trigger"));
            } else {
                Trigger::Literal(trigger)
            }
        }
        (None, Some(pattern)) => {
            Trigger::Pattern(Pattern::with_flags(expand_variables(&pattern, variables), raw.flags))
        }
        (Some(_), Some(_)) => return Err(shape("`trigger` and `pattern` are mutually exclusive")),
        (None, None) => return Err(shape("missing `trigger` or `pattern`")),
    };
    if let Trigger::Pattern(pattern) = &trigger {
        Regex::new(&pattern.anchored_source())
            .map_err(|source| RuleSourceError::Pattern { index, source })?;
    }

    let template = match (raw.replacement, raw.function) {
        (Some(text), None) => Template::Text(text),
        (None, Some(source)) => Template::Function(
            CaptureFn::parse(&source).map_err(|source| RuleSourceError::Function { index, source })?,
        ),
        (Some(_), Some(_)) => return Err(shape("`replacement` and `function` are mutually exclusive")),
        (None, None) => return Err(shape("missing `replacement` or `function`")),
    };

    Ok(Rule::new(trigger, template, options)
        .with_priority(raw.priority)
        .with_description(raw.description))
}

/// Parse a rule document. The document's `[variables]` are merged over
/// `variables`. Errors name the failing rule (1-based).
pub fn parse_rules(source: &str, variables: &HashMap<String, String>) -> Result<Vec<Rule>, RuleSourceError> {
    let file: RuleFile = toml::from_str(source)?;
    let mut merged = variables.clone();
    merged.extend(file.variables);

    file.rules
        .into_iter()
        .enumerate()
        .map(|(i, raw)| build_rule(i + 1, raw, &merged))
        .collect()
}

/// Serialize rules into a document that parses back to the same rules.
pub fn serialize_rules(rules: &[Rule]) -> Result<String, RuleSourceError> {
    let raw_rules = rules
        .iter()
        .map(|rule| {
            let mut raw = RawRule {
                options: rule.options.to_string(),
                priority: rule.priority,
                description: rule.description.clone(),
                ..RawRule::default()
            };
            match &rule.trigger {
                Trigger::Literal(trigger) => raw.trigger = Some(trigger.clone()),
                Trigger::Pattern(pattern) => {
                    raw.pattern = Some(pattern.source.clone());
                    raw.flags = pattern.flags.clone();
                }
            }
            match &rule.template {
                Template::Text(text) => raw.replacement = Some(text.clone()),
                Template::Function(func) => raw.function = Some(func.source().to_string()),
            }
            raw
        })
        .collect();
    let file = RuleFile {
        variables: BTreeMap::new(),
        rules: raw_rules,
    };
    Ok(toml::to_string_pretty(&file)?)
}
