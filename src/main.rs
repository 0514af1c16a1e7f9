use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rubick_rust::action::Action;
use rubick_rust::codec::{documents_from_yamls, documents_to_yamls};
use rubick_rust::config::RuleConfig;
use rubick_rust::context::{Context, FailureRecord};
use rubick_rust::tree::Document;
use rubick_rust::{apply_to_documents_with, parse_script};

#[derive(Parser)]
#[command(name = "rubick", about = "Rewrite Kubernetes YAML with IF/THEN rules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a script to every document of a YAML file
    Modify {
        /// Multi-document YAML input
        #[arg(short, long)]
        file: PathBuf,
        /// Script file
        #[arg(short, long)]
        scripts: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keys reported alongside each failure
        #[arg(long = "log-key", default_values_t = default_log_keys())]
        log_keys: Vec<String>,
    },
    /// Apply a rule file to the resources it selects
    Exec {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long = "log-key", default_values_t = default_log_keys())]
        log_keys: Vec<String>,
    },
    /// Check that a script parses
    Validate {
        #[arg(short, long)]
        scripts: PathBuf,
    },
}

fn default_log_keys() -> Vec<String> {
    vec!["kind".to_string(), "metadata.namespace".to_string(), "metadata.name".to_string()]
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Modify {
            file,
            scripts,
            output,
            log_keys,
        } => {
            let script = read(&scripts)?;
            let actions = parse_script(&script)?;
            let documents = documents_from_yamls(&read(&file)?)?;
            modify(documents, &actions, output.as_deref(), log_keys)
        }
        Command::Exec {
            config,
            file,
            output,
            log_keys,
        } => {
            let config = RuleConfig::parse(&read(&config)?)?;
            if let Some(kubeconfig) = &config.kubeconfig {
                tracing::debug!(kubeconfig = %kubeconfig, "rule file names a kubeconfig");
            }
            let documents = config.select(documents_from_yamls(&read(&file)?)?);
            modify(documents, &config.actions, output.as_deref(), log_keys)
        }
        Command::Validate { scripts } => {
            let actions = parse_script(&read(&scripts)?)?;
            println!("ok: {} action(s)", actions.len());
            Ok(())
        }
    }
}

fn modify(
    documents: Vec<Document>,
    actions: &[Action],
    output: Option<&Path>,
    log_keys: Vec<String>,
) -> Result<()> {
    let applied = apply_to_documents_with(Context::with_log_keys(log_keys), documents, actions);
    report(&applied.failures);
    for record in &applied.printed {
        eprintln!("{}", record);
    }

    if applied.value.is_empty() {
        println!("no results");
        return Ok(());
    }

    let rendered = documents_to_yamls(&applied.value)?;
    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}

fn report(failures: &[FailureRecord]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("{} action(s) failed:", failures.len());
    for failure in failures {
        eprintln!("  {}", failure);
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
