//! Session acquisition settings.

use std::{fmt, path::PathBuf, time::Duration};

/// Which acquisition strategy a session was created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    ManagedRemote,
    LocalProcess,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedRemote => write!(f, "managed-remote"),
            Self::LocalProcess => write!(f, "local-process"),
        }
    }
}

/// An externally operated browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEndpoint {
    /// DevTools WebSocket URL, used as-is.
    WebSocket(String),
    /// HTTP control URL; the WebSocket URL is discovered from `/json/version`.
    ControlUrl(String),
}

impl RemoteEndpoint {
    pub fn as_str(&self) -> &str {
        match self {
            Self::WebSocket(url) | Self::ControlUrl(url) => url,
        }
    }
}

/// Parameters for launching a local browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Local launch permitted at all.
    pub allowed: bool,
    /// The deployment intentionally omits the browser binary.
    pub skip_binary: bool,
    pub chrome_path: Option<String>,
    pub user_data_dir: Option<PathBuf>,
    pub headless: bool,
    pub extra_args: Vec<String>,
}

/// Arguments always passed to a locally launched browser.
pub const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            allowed: true,
            skip_binary: false,
            chrome_path: None,
            user_data_dir: None,
            headless: true,
            extra_args: Vec::new(),
        }
    }
}

impl LaunchOptions {
    /// All command-line arguments for the launch, fixed ones first.
    pub fn args(&self) -> Vec<String> {
        LAUNCH_ARGS
            .iter()
            .map(|a| (*a).to_string())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}

/// The strategy is chosen once, from configuration.
#[derive(Debug, Clone)]
pub enum AcquisitionStrategy {
    ManagedRemote(RemoteEndpoint),
    LocalProcess(LaunchOptions),
}

impl AcquisitionStrategy {
    pub fn mode(&self) -> SessionMode {
        match self {
            Self::ManagedRemote(_) => SessionMode::ManagedRemote,
            Self::LocalProcess(_) => SessionMode::LocalProcess,
        }
    }
}

/// Everything the session manager needs from configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub strategy: AcquisitionStrategy,
    /// Accept invalid TLS certificates on remote connections.
    pub ignore_https_errors: bool,
    /// Upper bound for CDP round-trips and for browser teardown at shutdown.
    pub request_timeout: Duration,
}

impl From<&readproxy_config::BrowserConfig> for SessionConfig {
    fn from(cfg: &readproxy_config::BrowserConfig) -> Self {
        let pick = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let strategy = if let Some(ws) = pick(&cfg.ws_endpoint) {
            AcquisitionStrategy::ManagedRemote(RemoteEndpoint::WebSocket(ws))
        } else if let Some(url) = pick(&cfg.control_url) {
            AcquisitionStrategy::ManagedRemote(RemoteEndpoint::ControlUrl(url))
        } else {
            AcquisitionStrategy::LocalProcess(LaunchOptions {
                allowed: cfg.allow_local_launch,
                skip_binary: cfg.skip_local_binary,
                chrome_path: cfg.chrome_path.clone(),
                user_data_dir: cfg.user_data_dir.clone(),
                headless: cfg.headless,
                extra_args: cfg.chrome_args.clone(),
            })
        };

        Self {
            strategy,
            ignore_https_errors: cfg.ignore_https_errors,
            request_timeout: Duration::from_millis(cfg.navigation_timeout_ms),
        }
    }
}

/// Viewport applied to every rendering context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_endpoint_selects_managed_remote() {
        let cfg = readproxy_config::BrowserConfig {
            ws_endpoint: Some("ws://127.0.0.1:9222/devtools/browser/1".into()),
            ..Default::default()
        };
        let session = SessionConfig::from(&cfg);
        assert_eq!(session.strategy.mode(), SessionMode::ManagedRemote);
        assert!(matches!(
            session.strategy,
            AcquisitionStrategy::ManagedRemote(RemoteEndpoint::WebSocket(_))
        ));
    }

    #[test]
    fn control_url_selects_managed_remote() {
        let cfg = readproxy_config::BrowserConfig {
            control_url: Some(" http://browserless:3000 ".into()),
            ..Default::default()
        };
        let AcquisitionStrategy::ManagedRemote(endpoint) = SessionConfig::from(&cfg).strategy
        else {
            panic!("expected managed-remote");
        };
        assert_eq!(
            endpoint,
            RemoteEndpoint::ControlUrl("http://browserless:3000".into())
        );
    }

    #[test]
    fn no_endpoint_selects_local_process() {
        let cfg = readproxy_config::BrowserConfig {
            allow_local_launch: true,
            headless: false,
            chrome_args: vec!["--lang=en-US".into()],
            navigation_timeout_ms: 10_000,
            ..Default::default()
        };
        let session = SessionConfig::from(&cfg);
        assert_eq!(session.request_timeout, Duration::from_secs(10));
        let AcquisitionStrategy::LocalProcess(opts) = session.strategy else {
            panic!("expected local-process");
        };
        assert!(opts.allowed);
        assert!(!opts.headless);
        let args = opts.args();
        assert_eq!(args.first().map(String::as_str), Some("--no-sandbox"));
        assert_eq!(args.last().map(String::as_str), Some("--lang=en-US"));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
    }

    #[test]
    fn mode_display_matches_glossary() {
        assert_eq!(SessionMode::ManagedRemote.to_string(), "managed-remote");
        assert_eq!(SessionMode::LocalProcess.to_string(), "local-process");
    }
}
