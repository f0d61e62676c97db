use {anyhow::Result, clap::Subcommand};

use readproxy_config::{ProxyConfig, Severity, ValidationResult, validate};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the resolved configuration and report errors/warnings.
    Check,
    /// Print the resolved configuration (file + environment + flags) as TOML.
    Show,
}

pub fn handle_config(action: ConfigAction, config: &ProxyConfig) -> Result<()> {
    match action {
        ConfigAction::Check => {
            let result = validate(config);
            report(&result);
            if result.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        },
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print every diagnostic to stderr, followed by a summary line.
pub fn report(result: &ValidationResult) {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
    }
}
