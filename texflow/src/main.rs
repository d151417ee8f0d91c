use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use texflow::{Keymap, Outcome, Profile, RedbStore, Repl, SnippetEngine, TexflowConfig};
use texflow_core::parse_rules;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "texflow", about = "Interactive LaTeX snippet editor")]
struct Args {
    /// TOML config file (engine settings, rules_path, store_path, variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rule document to use instead of the built-in table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// redb file holding the saved profile
    #[arg(long)]
    store: Option<PathBuf>,

    /// Treat the whole document as math
    #[arg(long)]
    math: bool,

    /// Print a preview of the buffer after every line
    #[arg(long)]
    preview: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TEXFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

type Session = (SnippetEngine, Option<Profile<RedbStore>>, HashMap<String, String>);

fn build_session(args: &Args) -> Result<Session> {
    let mut cfg = match &args.config {
        Some(path) => TexflowConfig::load_toml(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TexflowConfig::default(),
    };
    if args.rules.is_some() {
        cfg.rules_path = args.rules.clone();
    }
    if args.store.is_some() {
        cfg.store_path = args.store.clone();
    }
    let variables = cfg.snippet_variables();

    let profile = match &cfg.store_path {
        Some(path) => Some(Profile::new(
            RedbStore::open(path).with_context(|| format!("failed to open store {}", path.display()))?,
            variables.clone(),
        )),
        None => None,
    };

    let rules = match (&cfg.rules_path, &profile) {
        (Some(path), _) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read rules {}", path.display()))?;
            parse_rules(&source, &variables).with_context(|| format!("invalid rules in {}", path.display()))?
        }
        (None, Some(profile)) => profile.load_rules().context("failed to load saved rules")?,
        (None, None) => parse_rules(texflow::DEFAULT_RULES_SOURCE, &variables).context("built-in rules")?,
    };

    let (mut base, keymap) = match &profile {
        // an explicit config file wins over the saved one
        Some(profile) if args.config.is_none() => (
            profile.load_config(cfg.base.clone()).context("failed to load saved config")?,
            profile.load_keymap().context("failed to load saved keybindings")?,
        ),
        Some(profile) => (
            cfg.base.clone(),
            profile.load_keymap().context("failed to load saved keybindings")?,
        ),
        None => (cfg.base.clone(), Keymap::default()),
    };
    if args.math {
        base.set_force_math(true);
    }

    tracing::info!(rules = rules.len(), bindings = keymap.len(), "engine ready");
    Ok((SnippetEngine::new(base, rules, keymap), profile, variables))
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let (engine, profile, variables) = build_session(&args)?;
    let mut repl = Repl::new(engine, profile, variables).with_preview(args.preview);

    println!("texflow: type a line and press Enter. \\t Tab, \\n newline, \\u undo, \\r redo, \\e escape.");
    println!("{}", texflow::repl::HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match repl.handle_line(&line) {
            Outcome::Quit => break,
            Outcome::Reply(lines) => {
                for reply in lines {
                    writeln!(stdout, "  {reply}")?;
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}
