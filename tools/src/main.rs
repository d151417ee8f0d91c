use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use texflow::script::{annotate, key_events};
use texflow::{default_variables, Config, Keymap, Rule, SnippetEngine, DEFAULT_RULES_SOURCE};
use texflow_core::{parse_rules, serialize_rules, Template, Trigger};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "texflow-rules", about = "Maintain texflow rule documents")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rule document and report what it contains
    Check {
        /// Rule document; the built-in table when omitted
        file: Option<PathBuf>,
    },
    /// Rewrite a rule document in canonical form
    Fmt {
        file: PathBuf,
        /// Overwrite the file instead of printing
        #[arg(long)]
        write: bool,
    },
    /// Type a key script into a fresh engine and print the result
    Expand {
        /// Keys to type (`\t` Tab, `\n` Enter, `\u` undo, `\r` redo, `\e` escape)
        input: String,
        /// Rule document; the built-in table when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Treat the whole document as math
        #[arg(long)]
        math: bool,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    total: usize,
    literal: usize,
    pattern: usize,
    function: usize,
    auto: usize,
    visual: usize,
}

fn summarize(rules: &[Rule]) -> Summary {
    let mut summary = Summary {
        total: rules.len(),
        ..Summary::default()
    };
    for rule in rules {
        match rule.trigger {
            Trigger::Literal(_) => summary.literal += 1,
            Trigger::Pattern(_) => summary.pattern += 1,
        }
        if matches!(rule.template, Template::Function(_)) {
            summary.function += 1;
        }
        if rule.options.auto {
            summary.auto += 1;
        }
        if rule.uses_visual() {
            summary.visual += 1;
        }
    }
    summary
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
        None => Ok(DEFAULT_RULES_SOURCE.to_string()),
    }
}

fn load_rules(file: Option<&Path>) -> Result<Vec<Rule>> {
    let source = read_source(file)?;
    let name = file.map_or_else(|| "built-in rules".to_string(), |p| p.display().to_string());
    parse_rules(&source, &default_variables()).with_context(|| format!("invalid rules in {name}"))
}

/// Type `input` into a fresh engine and return the annotated buffer.
fn expand(rules: Vec<Rule>, input: &str, math: bool) -> String {
    let mut config = Config::default();
    config.set_force_math(math);
    let mut engine = SnippetEngine::new(config, rules, Keymap::default());
    for event in key_events(input) {
        engine.process_key(event);
    }
    annotate(engine.text(), engine.selection())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("TEXFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let args = Args::parse();
    match args.command {
        Commands::Check { file } => {
            let rules = load_rules(file.as_deref())?;
            let s = summarize(&rules);
            println!(
                "{} rules: {} literal, {} pattern, {} function, {} auto-fire, {} surround",
                s.total, s.literal, s.pattern, s.function, s.auto, s.visual
            );
        }
        Commands::Fmt { file, write } => {
            let rules = load_rules(Some(&file))?;
            let text = serialize_rules(&rules).context("failed to serialize rules")?;
            if write {
                std::fs::write(&file, &text).with_context(|| format!("failed to write {}", file.display()))?;
                println!("Formatted {} rules in {}", rules.len(), file.display());
            } else {
                print!("{text}");
            }
        }
        Commands::Expand { input, rules, math } => {
            let rules = load_rules(rules.as_deref())?;
            println!("{}", expand(rules, &input, math));
        }
    }
    Ok(())
}
