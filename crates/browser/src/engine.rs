//! Rendering engine abstraction.
//!
//! The session manager and the extraction pipeline only talk to these
//! traits. [`crate::cdp::CdpEngine`] drives a real Chromium over the DevTools
//! protocol; [`crate::fake`] provides a scriptable stand-in for tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::BrowserError,
    types::{LaunchOptions, RemoteEndpoint, SessionConfig, Viewport},
};

/// Creates browser connections.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch a local browser process.
    async fn launch(
        &self,
        options: &LaunchOptions,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError>;

    /// Connect to an externally operated browser.
    async fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError>;
}

/// A live connection to one browser instance.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// False once the underlying connection has gone away.
    fn is_connected(&self) -> bool;

    /// Open a fresh, unconfigured rendering context (tab).
    async fn open_context(&self) -> Result<Box<dyn RenderingContext>, BrowserError>;

    /// Drop the connection, leaving the browser itself running.
    async fn disconnect(&self) -> Result<(), BrowserError>;

    /// Terminate the browser process.
    async fn terminate(&self) -> Result<(), BrowserError>;
}

/// One isolated browsing surface, owned by a single request.
#[async_trait]
pub trait RenderingContext: Send {
    async fn set_user_agent(
        &mut self,
        user_agent: &str,
        accept_language: &str,
        platform: &str,
    ) -> Result<(), BrowserError>;

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BrowserError>;

    async fn set_extra_headers(&mut self, headers: &[(&str, &str)]) -> Result<(), BrowserError>;

    async fn set_timezone(&mut self, timezone: &str) -> Result<(), BrowserError>;

    /// Register a script that runs before any page script on every document.
    async fn add_init_script(&mut self, source: &str) -> Result<(), BrowserError>;

    /// Navigate and wait until the network has been (almost) idle for a
    /// short settle period. Callers bound this with their own timeout.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Serialized HTML of the current document after script execution.
    async fn content(&mut self) -> Result<String, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}
