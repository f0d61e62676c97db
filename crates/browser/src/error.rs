//! Browser error types.

use std::time::Duration;

use {
    readproxy_common::{Classify, ErrorKind},
    thiserror::Error,
};

/// Errors that can occur while acquiring or driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(
        "browser endpoint not configured and local Chromium launch disabled. \
         Set BROWSERLESS_WS_ENDPOINT or ALLOW_LOCAL_LAUNCH=true."
    )]
    LocalLaunchDisabled,

    #[error(
        "local Chromium launch requested but this deployment ships without a browser binary. \
         Configure BROWSERLESS_WS_ENDPOINT or BROWSERLESS_URL instead."
    )]
    LocalBinarySkipped,

    #[error("browser not available: {0}")]
    BrowserNotAvailable(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("failed to connect to remote browser at {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("browser connection closed")]
    ConnectionClosed,

    #[error("failed to open rendering context: {0}")]
    ContextFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("navigation timed out after {}ms", .0.as_millis())]
    NavigationTimeout(Duration),

    #[error("failed to capture rendered document: {0}")]
    CaptureFailed(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(err.to_string())
    }
}

impl BrowserError {
    /// Configuration errors are fatal on first use and never retried.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::LocalLaunchDisabled | Self::LocalBinarySkipped | Self::BrowserNotAvailable(_)
        )
    }
}

impl Classify for BrowserError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::LocalLaunchDisabled | Self::LocalBinarySkipped | Self::BrowserNotAvailable(_) => {
                ErrorKind::Configuration
            },
            Self::NavigationFailed(_) | Self::NavigationTimeout(_) => ErrorKind::Navigation,
            Self::LaunchFailed(_)
            | Self::ConnectFailed { .. }
            | Self::ConnectionClosed
            | Self::ContextFailed(_)
            | Self::CaptureFailed(_)
            | Self::Cdp(_) => ErrorKind::Infrastructure,
        }
    }
}
