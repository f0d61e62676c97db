//! Browser session lifecycle.
//!
//! [`SessionManager`] owns the one shared browser in local-process mode and
//! hands out per-request connections in managed-remote mode. Every
//! acquisition yields a [`Session`]; every context opened from it is wrapped
//! in a [`ContextGuard`] that closes it exactly once, even if the request
//! future is dropped half-way.

use std::{sync::Arc, time::Duration};

use {
    tokio::{sync::Mutex, time::timeout},
    tracing::{debug, info, warn},
};

use crate::{
    engine::{BrowserEngine, BrowserHandle, RenderingContext},
    error::BrowserError,
    fingerprint::FingerprintProfile,
    types::{AcquisitionStrategy, LaunchOptions, SessionConfig, SessionMode},
};

/// Upper bound for tearing down a browser or connection.
pub const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SessionManager {
    config: SessionConfig,
    engine: Arc<dyn BrowserEngine>,
    /// Shared local browser. The lock is held across the launch so that
    /// concurrent first callers all wait on the same creation.
    local: Mutex<Option<Arc<dyn BrowserHandle>>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, engine: Arc<dyn BrowserEngine>) -> Self {
        info!(mode = %config.strategy.mode(), "session manager initialized");
        Self {
            config,
            engine,
            local: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.config.strategy.mode()
    }

    /// Acquire a browser for one request.
    pub async fn acquire(&self) -> Result<Session, BrowserError> {
        match &self.config.strategy {
            AcquisitionStrategy::ManagedRemote(endpoint) => {
                let handle = self.engine.connect(endpoint, &self.config).await?;
                debug!(endpoint = endpoint.as_str(), "connected to managed browser");
                Ok(Session::new(handle, SessionMode::ManagedRemote))
            },
            AcquisitionStrategy::LocalProcess(options) => {
                let handle = self.acquire_local(options).await?;
                Ok(Session::new(handle, SessionMode::LocalProcess))
            },
        }
    }

    /// Return the shared local browser, launching it if there is none and
    /// relaunching it once if the cached one has died.
    ///
    /// The slot lock stays held across teardown of a dead browser and the
    /// relaunch, so concurrent callers wait for that recovery instead of
    /// starting browsers of their own.
    async fn acquire_local(
        &self,
        options: &LaunchOptions,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        if !options.allowed {
            return Err(BrowserError::LocalLaunchDisabled);
        }
        if options.skip_binary {
            return Err(BrowserError::LocalBinarySkipped);
        }

        let mut slot = self.local.lock().await;
        match slot.take() {
            Some(handle) if handle.is_connected() => {
                *slot = Some(Arc::clone(&handle));
                return Ok(handle);
            },
            Some(stale) => {
                warn!("shared browser disconnected, relaunching");
                discard(stale).await;
            },
            None => {},
        }

        let handle = self.engine.launch(options, &self.config).await?;
        info!(headless = options.headless, "launched shared browser");
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Tear down browser state at process shutdown. Bounded by
    /// [`TEARDOWN_TIMEOUT`] so a wedged connection cannot block exit.
    pub async fn shutdown(&self) {
        if self.mode() == SessionMode::ManagedRemote {
            info!("managed-remote mode: leaving remote browser running");
            return;
        }

        let teardown = async {
            let handle = self.local.lock().await.take();
            match handle {
                Some(handle) => handle.terminate().await,
                None => Ok(()),
            }
        };
        match timeout(TEARDOWN_TIMEOUT, teardown).await {
            Ok(Ok(())) => info!("browser shut down"),
            Ok(Err(e)) => warn!(error = %e, "failed to close browser cleanly"),
            Err(_) => warn!(
                timeout_ms = TEARDOWN_TIMEOUT.as_millis() as u64,
                "browser shutdown timed out"
            ),
        }
    }
}

/// Terminate a dead shared browser; any error is expected and swallowed.
async fn discard(stale: Arc<dyn BrowserHandle>) {
    match timeout(TEARDOWN_TIMEOUT, stale.terminate()).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => debug!(error = %e, "ignoring error while discarding dead browser"),
        Err(_) => debug!("timed out discarding dead browser"),
    }
}

/// A browser acquired for one request.
///
/// In managed-remote mode the connection belongs to this session alone and
/// is disconnected exactly once, by [`Session::release`] or on drop.
pub struct Session {
    handle: Arc<dyn BrowserHandle>,
    mode: SessionMode,
    released: bool,
}

impl Session {
    fn new(handle: Arc<dyn BrowserHandle>, mode: SessionMode) -> Self {
        Self {
            handle,
            mode,
            released: false,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Open a rendering context with `profile` applied. If applying the
    /// profile fails the context is closed before returning.
    pub async fn open_context(
        &self,
        profile: &FingerprintProfile,
    ) -> Result<ContextGuard, BrowserError> {
        let mut guard = ContextGuard::new(self.handle.open_context().await?);
        let applied = match guard.context() {
            Ok(ctx) => profile.apply(ctx).await,
            Err(e) => Err(e),
        };
        if let Err(e) = applied {
            guard.close().await;
            return Err(e);
        }
        Ok(guard)
    }

    /// End the session. Disconnects a managed-remote connection; the shared
    /// local browser stays up for the next request.
    pub async fn release(mut self) {
        self.released = true;
        if self.mode == SessionMode::ManagedRemote {
            disconnect(Arc::clone(&self.handle)).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released || self.mode != SessionMode::ManagedRemote {
            return;
        }
        let handle = Arc::clone(&self.handle);
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(disconnect(handle));
        }
    }
}

async fn disconnect(handle: Arc<dyn BrowserHandle>) {
    match timeout(TEARDOWN_TIMEOUT, handle.disconnect()).await {
        Ok(Ok(())) => debug!("disconnected from managed browser"),
        Ok(Err(e)) => debug!(error = %e, "ignoring disconnect error"),
        Err(_) => warn!("timed out disconnecting from managed browser"),
    }
}

/// Owns one rendering context and guarantees it is closed exactly once.
pub struct ContextGuard {
    ctx: Option<Box<dyn RenderingContext>>,
}

impl ContextGuard {
    pub fn new(ctx: Box<dyn RenderingContext>) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn context(&mut self) -> Result<&mut dyn RenderingContext, BrowserError> {
        match self.ctx.as_deref_mut() {
            Some(ctx) => Ok(ctx),
            None => Err(BrowserError::ContextFailed("context already closed".into())),
        }
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.context()?.navigate(url).await
    }

    pub async fn content(&mut self) -> Result<String, BrowserError> {
        self.context()?.content().await
    }

    /// Close the context. Errors are logged, never returned, so they cannot
    /// mask the request's own outcome.
    pub async fn close(mut self) {
        if let Some(ctx) = self.ctx.take() {
            close_context(ctx).await;
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let Some(ctx) = self.ctx.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                debug!("rendering context dropped without close, closing in background");
                rt.spawn(close_context(ctx));
            },
            Err(_) => warn!("rendering context dropped outside a runtime, leaking it"),
        }
    }
}

async fn close_context(ctx: Box<dyn RenderingContext>) {
    match timeout(TEARDOWN_TIMEOUT, ctx.close()).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => debug!(error = %e, "ignoring error while closing rendering context"),
        Err(_) => warn!("timed out closing rendering context"),
    }
}
