//! CLI subcommands for inspecting browser acquisition.

use {anyhow::Result, clap::Subcommand};

use {
    readproxy_browser::{AcquisitionStrategy, SessionConfig, detect},
    readproxy_config::ProxyConfig,
};

#[derive(Subcommand)]
pub enum BrowserAction {
    /// Show how the proxy will acquire a browser.
    Status,
}

pub fn handle_browser(action: BrowserAction, config: &ProxyConfig) -> Result<()> {
    match action {
        BrowserAction::Status => status(config),
    }
}

fn status(config: &ProxyConfig) -> Result<()> {
    let session = SessionConfig::from(&config.browser);
    println!("Browser acquisition:");
    println!("  mode:               {}", session.strategy.mode());
    println!(
        "  navigation timeout: {}ms",
        session.request_timeout.as_millis()
    );

    match &session.strategy {
        AcquisitionStrategy::ManagedRemote(endpoint) => {
            println!("  endpoint:           {}", endpoint.as_str());
            println!("  ignore TLS errors:  {}", session.ignore_https_errors);
        },
        AcquisitionStrategy::LocalProcess(options) => {
            println!("  launch allowed:     {}", options.allowed);
            println!("  binary skipped:     {}", options.skip_binary);
            println!("  headless:           {}", options.headless);
            if let Some(dir) = &options.user_data_dir {
                println!("  user data dir:      {}", dir.display());
            }
            println!("  args:               {}", options.args().join(" "));
            match detect::detect_browser(options.chrome_path.as_deref()) {
                Ok(path) => println!("  executable:         {}", path.display()),
                Err(hint) => println!("  executable:         (not found)\n\n{hint}"),
            }
        },
    }

    let fp = &config.fingerprint;
    println!("\nFingerprint:");
    println!("  user agent:         {}", fp.user_agent);
    println!("  accept-language:    {}", fp.accept_language);
    println!("  timezone:           {}", fp.timezone);
    println!(
        "  viewport:           {}x{} @{}",
        fp.viewport_width, fp.viewport_height, fp.device_scale_factor
    );

    Ok(())
}
