use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use tempvoice_config::{
    Diagnostic, TempVoiceConfig,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration with the token redacted.
    Show,
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config_path, verbose),
        ConfigAction::Show => {
            let config = tempvoice_config::load_or_discover(config_path)?;
            print!("{}", render(&config)?);
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(config_path);
    match &result.config_path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let visible: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    for diagnostic in &visible {
        eprintln!("  {}", describe(diagnostic));
    }
    if !visible.is_empty() {
        eprintln!();
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    match (errors, warnings) {
        (0, 0) => eprintln!("No issues found."),
        _ => eprintln!("{errors} error(s), {warnings} warning(s)"),
    }
    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn describe(diagnostic: &Diagnostic) -> String {
    let color = match diagnostic.severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    };
    let label = format!("{BOLD}{color}{}{RESET}", diagnostic.severity);
    if diagnostic.path.is_empty() {
        format!("{label} [{}] {}", diagnostic.category, diagnostic.message)
    } else {
        format!(
            "{label} [{}] {}: {}",
            diagnostic.category, diagnostic.path, diagnostic.message
        )
    }
}

fn render(config: &TempVoiceConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
