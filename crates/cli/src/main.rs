mod browser_commands;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    readproxy_config::{ProxyConfig, Severity},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "readproxy",
    version,
    about = "readproxy: render web pages in a browser and serve their readable text"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config and environment).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and `PORT`).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of discovering `readproxy.{toml,yaml,yml,json}`.
    #[arg(long, global = true, env = "READPROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server (default when no subcommand is provided).
    Serve,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Browser acquisition inspection.
    Browser {
        #[command(subcommand)]
        action: browser_commands::BrowserAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Defaults, then the config file, then environment variables, then flags.
fn resolve_config(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ProxyConfig> {
    let mut config = match &cli.config {
        Some(path) => readproxy_config::load_config(path)?,
        None => readproxy_config::discover_and_load(),
    };
    readproxy_config::apply_env_overrides_with(&mut config, lookup);

    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = resolve_config(&cli, |key| std::env::var(key).ok())?;

    match cli.command {
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "readproxy starting");

            let result = readproxy_config::validate(&config);
            for d in &result.diagnostics {
                match d.severity {
                    Severity::Error => error!(path = %d.path, category = d.category, "{}", d.message),
                    Severity::Warning => warn!(path = %d.path, category = d.category, "{}", d.message),
                }
            }
            if result.has_errors() {
                anyhow::bail!(
                    "invalid configuration: {} error(s), run `readproxy config check` for details",
                    result.count(Severity::Error)
                );
            }

            readproxy_gateway::start_gateway(&config).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
        Some(Commands::Browser { action }) => browser_commands::handle_browser(action, &config),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 4000\n\n[browser]\nheadless = false").unwrap();
        file
    }

    #[test]
    fn environment_overrides_file() {
        let file = config_file();
        let cli = Cli::parse_from(["readproxy", "--config", file.path().to_str().unwrap()]);

        let config = resolve_config(&cli, |key| (key == "PORT").then(|| "5000".into())).unwrap();
        assert_eq!(config.server.port, 5000);
        assert!(!config.browser.headless);
    }

    #[test]
    fn flags_override_environment() {
        let file = config_file();
        let cli = Cli::parse_from([
            "readproxy",
            "--config",
            file.path().to_str().unwrap(),
            "--port",
            "6000",
            "--bind",
            "127.0.0.1",
        ]);

        let config = resolve_config(&cli, |key| (key == "PORT").then(|| "5000".into())).unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.bind, "127.0.0.1");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let cli = Cli::parse_from(["readproxy", "--config", "/nonexistent/readproxy.toml"]);
        assert!(resolve_config(&cli, |_| None).is_err());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from(["readproxy", "config", "check"]);
        assert!(matches!(cli.command, Some(Commands::Config { .. })));
        let cli = Cli::parse_from(["readproxy", "browser", "status", "--json-logs"]);
        assert!(matches!(cli.command, Some(Commands::Browser { .. })));
        assert!(cli.json_logs);
    }
}
