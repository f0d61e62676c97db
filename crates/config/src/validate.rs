//! Configuration validation.
//!
//! Runs once at startup over the fully resolved [`ProxyConfig`]. Contradictory
//! browser-acquisition settings are errors rather than being silently
//! resolved by precedence.

use crate::schema::ProxyConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "conflict", "value", "acquisition"
    pub category: &'static str,
    /// Dotted path, e.g. "browser.ws_endpoint"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a resolved configuration.
#[must_use]
pub fn validate(config: &ProxyConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    check_acquisition(config, &mut result);
    check_values(config, &mut result);
    result
}

fn check_acquisition(config: &ProxyConfig, result: &mut ValidationResult) {
    let browser = &config.browser;
    let ws = browser
        .ws_endpoint
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let control = browser
        .control_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if ws.is_some() && control.is_some() {
        result.push(
            Severity::Error,
            "conflict",
            "browser.control_url",
            "both ws_endpoint and control_url are set; configure exactly one remote endpoint",
        );
    }

    if let Some(ws) = ws {
        let lower = ws.to_ascii_lowercase();
        if !(lower.starts_with("ws://") || lower.starts_with("wss://")) {
            result.push(
                Severity::Error,
                "value",
                "browser.ws_endpoint",
                format!("expected a ws:// or wss:// URL, got \"{ws}\""),
            );
        }
    }

    if let Some(control) = control {
        let lower = control.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            result.push(
                Severity::Error,
                "value",
                "browser.control_url",
                format!("expected an http:// or https:// URL, got \"{control}\""),
            );
        }
    }

    let remote = ws.is_some() || control.is_some();
    if remote && browser.allow_local_launch {
        result.push(
            Severity::Error,
            "conflict",
            "browser.allow_local_launch",
            "a remote browser endpoint is configured; local launch must stay disabled",
        );
    }

    if !remote && !browser.allow_local_launch {
        result.push(
            Severity::Warning,
            "acquisition",
            "browser",
            "no remote endpoint configured and local launch disabled; every extraction will fail",
        );
    } else if !remote && browser.skip_local_binary {
        result.push(
            Severity::Warning,
            "acquisition",
            "browser.skip_local_binary",
            "local launch is allowed but the browser binary is skipped; every extraction will fail",
        );
    }
}

fn check_values(config: &ProxyConfig, result: &mut ValidationResult) {
    let fp = &config.fingerprint;
    if fp.viewport_width == 0 {
        result.push(Severity::Error, "value", "fingerprint.viewport_width", "must be > 0");
    }
    if fp.viewport_height == 0 {
        result.push(Severity::Error, "value", "fingerprint.viewport_height", "must be > 0");
    }
    if !(fp.device_scale_factor.is_finite() && fp.device_scale_factor > 0.0) {
        result.push(
            Severity::Error,
            "value",
            "fingerprint.device_scale_factor",
            "must be a positive number",
        );
    }
    if fp.user_agent.trim().is_empty() {
        result.push(
            Severity::Warning,
            "value",
            "fingerprint.user_agent",
            "empty user agent; the browser default will be sent",
        );
    }
    if config.browser.navigation_timeout_ms == 0 {
        result.push(Severity::Error, "value", "browser.navigation_timeout_ms", "must be > 0");
    }
    if config.diagnostics.truncate_limit == 0 {
        result.push(
            Severity::Warning,
            "value",
            "diagnostics.truncate_limit",
            "0 hides every error message from callers",
        );
    }
}
