/// Config schema types (server, browser acquisition, fingerprint, diagnostics).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration, resolved once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub fingerprint: FingerprintConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 3000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// How the shared browser is acquired.
///
/// Setting `ws_endpoint` or `control_url` selects the managed-remote
/// strategy; otherwise a local process is launched, provided
/// `allow_local_launch` is on and `skip_local_binary` is off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// DevTools WebSocket endpoint of an externally managed browser
    /// (e.g. `wss://browserless.example/?token=...`).
    pub ws_endpoint: Option<String>,
    /// HTTP control URL of an externally managed browser; the WebSocket
    /// endpoint is discovered through `/json/version`.
    pub control_url: Option<String>,
    /// Permit launching a local Chromium when no remote endpoint is set.
    pub allow_local_launch: bool,
    /// The deployment ships without a browser binary; local launch fails fast.
    pub skip_local_binary: bool,
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Profile directory for the local browser.
    pub user_data_dir: Option<PathBuf>,
    /// Whether to run the local browser headless.
    pub headless: bool,
    /// Additional Chrome arguments for local launch.
    #[serde(default)]
    pub chrome_args: Vec<String>,
    /// Navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Accept invalid TLS certificates on managed-remote connections.
    pub ignore_https_errors: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: None,
            control_url: None,
            allow_local_launch: false,
            skip_local_binary: false,
            chrome_path: None,
            user_data_dir: None,
            headless: true,
            chrome_args: Vec::new(),
            navigation_timeout_ms: 45_000,
            ignore_https_errors: true,
        }
    }
}

impl BrowserConfig {
    /// Whether a managed-remote endpoint of either form is configured.
    #[must_use]
    pub fn has_remote_endpoint(&self) -> bool {
        non_blank(self.ws_endpoint.as_deref()) || non_blank(self.control_url.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Client-identifying signals applied to every rendering context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub user_agent: String,
    /// Value of the `Accept-Language` header.
    pub accept_language: String,
    /// IANA timezone emulated in the page.
    pub timezone: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    /// Value reported by `navigator.languages`.
    pub navigator_languages: Vec<String>,
    /// Value reported by `navigator.platform`.
    pub navigator_platform: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            accept_language: "en-US,en;q=0.9".into(),
            timezone: "America/Los_Angeles".into(),
            viewport_width: 1280,
            viewport_height: 720,
            device_scale_factor: 1.0,
            navigator_languages: vec!["en-US".into(), "en".into()],
            navigator_platform: "Win32".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Log full structured error records instead of truncated one-liners.
    pub verbose: bool,
    /// Character cap for truncated error messages.
    pub truncate_limit: usize,
    /// Append a JSON line per failure to this file.
    pub error_log_path: Option<PathBuf>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            truncate_limit: 400,
            error_log_path: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.browser.navigation_timeout_ms, 45_000);
        assert!(cfg.browser.headless);
        assert!(!cfg.browser.allow_local_launch);
        assert_eq!(cfg.fingerprint.viewport_width, 1280);
        assert_eq!(cfg.fingerprint.viewport_height, 720);
        assert_eq!(cfg.fingerprint.accept_language, "en-US,en;q=0.9");
        assert_eq!(cfg.fingerprint.timezone, "America/Los_Angeles");
        assert_eq!(cfg.diagnostics.truncate_limit, 400);
    }

    #[test]
    fn partial_toml_keeps_section_defaults() {
        let cfg: ProxyConfig = toml::from_str(
            r#"
            [browser]
            ws_endpoint = "ws://127.0.0.1:9222/devtools/browser/abc"

            [fingerprint]
            timezone = "Europe/Berlin"
            "#,
        )
        .unwrap();
        assert!(cfg.browser.has_remote_endpoint());
        assert_eq!(cfg.browser.navigation_timeout_ms, 45_000);
        assert_eq!(cfg.fingerprint.timezone, "Europe/Berlin");
        assert_eq!(cfg.fingerprint.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn blank_endpoint_is_not_remote() {
        let cfg = BrowserConfig {
            control_url: Some("   ".into()),
            ..Default::default()
        };
        assert!(!cfg.has_remote_endpoint());
    }
}
