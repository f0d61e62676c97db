//! Scriptable in-memory engine for tests.
//!
//! Counts every launch, connect, disconnect, termination and context close
//! so tests can assert lifecycle invariants without a real browser.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    engine::{BrowserEngine, BrowserHandle, RenderingContext},
    error::BrowserError,
    types::{LaunchOptions, RemoteEndpoint, SessionConfig, Viewport},
};

/// How fake contexts behave.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    /// Document returned by `content()`.
    pub html: String,
    pub fail_open: bool,
    pub fail_user_agent: bool,
    pub fail_timezone: bool,
    /// Navigation fails with this message.
    pub fail_navigation: Option<String>,
    /// Navigation sleeps this long before succeeding.
    pub navigation_delay: Option<Duration>,
    pub fail_content: bool,
}

impl FakeScript {
    pub fn serving(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Default::default()
        }
    }
}

/// A call made on a fake context, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextCall {
    UserAgent {
        user_agent: String,
        accept_language: String,
        platform: String,
    },
    Viewport(Viewport),
    Headers(Vec<(String, String)>),
    Timezone(String),
    InitScript(String),
    Navigate(String),
    Content,
}

#[derive(Default)]
struct ContextState {
    calls: Mutex<Vec<ContextCall>>,
    closes: AtomicUsize,
}

/// Observer for one fake context, valid after the context is gone.
#[derive(Clone)]
pub struct ContextProbe(Arc<ContextState>);

impl ContextProbe {
    pub fn calls(&self) -> Vec<ContextCall> {
        self.0.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn close_count(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeContext {
    script: FakeScript,
    state: Arc<ContextState>,
}

impl FakeContext {
    pub fn new(script: FakeScript) -> (Self, ContextProbe) {
        let state = Arc::new(ContextState::default());
        (
            Self {
                script,
                state: Arc::clone(&state),
            },
            ContextProbe(state),
        )
    }

    fn record(&self, call: ContextCall) {
        if let Ok(mut calls) = self.state.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl RenderingContext for FakeContext {
    async fn set_user_agent(
        &mut self,
        user_agent: &str,
        accept_language: &str,
        platform: &str,
    ) -> Result<(), BrowserError> {
        if self.script.fail_user_agent {
            return Err(BrowserError::Cdp("user agent override rejected".into()));
        }
        self.record(ContextCall::UserAgent {
            user_agent: user_agent.into(),
            accept_language: accept_language.into(),
            platform: platform.into(),
        });
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BrowserError> {
        self.record(ContextCall::Viewport(viewport));
        Ok(())
    }

    async fn set_extra_headers(&mut self, headers: &[(&str, &str)]) -> Result<(), BrowserError> {
        self.record(ContextCall::Headers(
            headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        Ok(())
    }

    async fn set_timezone(&mut self, timezone: &str) -> Result<(), BrowserError> {
        if self.script.fail_timezone {
            return Err(BrowserError::Cdp(format!("Invalid timezone ID: {timezone}")));
        }
        self.record(ContextCall::Timezone(timezone.into()));
        Ok(())
    }

    async fn add_init_script(&mut self, source: &str) -> Result<(), BrowserError> {
        self.record(ContextCall::InitScript(source.into()));
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.record(ContextCall::Navigate(url.into()));
        if let Some(delay) = self.script.navigation_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script.fail_navigation {
            Some(msg) => Err(BrowserError::NavigationFailed(msg.clone())),
            None => Ok(()),
        }
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.record(ContextCall::Content);
        if self.script.fail_content {
            return Err(BrowserError::CaptureFailed("target crashed".into()));
        }
        Ok(self.script.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    terminations: AtomicUsize,
}

struct Shared {
    script: Mutex<FakeScript>,
    counters: Counters,
    contexts: Mutex<Vec<ContextProbe>>,
    browsers: Mutex<Vec<Arc<FakeBrowser>>>,
}

impl Shared {
    fn script(&self) -> FakeScript {
        self.script.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

pub struct FakeBrowser {
    connected: AtomicBool,
    shared: Arc<Shared>,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn open_context(&self) -> Result<Box<dyn RenderingContext>, BrowserError> {
        if !self.is_connected() {
            return Err(BrowserError::ConnectionClosed);
        }
        let script = self.shared.script();
        if script.fail_open {
            return Err(BrowserError::ContextFailed("Target.createTarget failed".into()));
        }
        let (ctx, probe) = FakeContext::new(script);
        if let Ok(mut contexts) = self.shared.contexts.lock() {
            contexts.push(probe);
        }
        Ok(Box::new(ctx))
    }

    async fn disconnect(&self) -> Result<(), BrowserError> {
        self.shared
            .counters
            .disconnects
            .fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), BrowserError> {
        self.shared
            .counters
            .terminations
            .fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Engine whose browsers and contexts are all fakes.
#[derive(Clone)]
pub struct FakeEngine {
    shared: Arc<Shared>,
    launch_delay: Option<Duration>,
    failing_launches: Arc<AtomicUsize>,
    fail_connect: bool,
}

impl FakeEngine {
    pub fn new(script: FakeScript) -> Self {
        Self {
            shared: Arc::new(Shared {
                script: Mutex::new(script),
                counters: Counters::default(),
                contexts: Mutex::new(Vec::new()),
                browsers: Mutex::new(Vec::new()),
            }),
            launch_delay: None,
            failing_launches: Arc::new(AtomicUsize::new(0)),
            fail_connect: false,
        }
    }

    /// Every launch takes this long, widening race windows.
    #[must_use]
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// The next `n` launches fail.
    pub fn fail_next_launches(&self, n: usize) {
        self.failing_launches.store(n, Ordering::SeqCst);
    }

    pub fn set_script(&self, script: FakeScript) {
        if let Ok(mut current) = self.shared.script.lock() {
            *current = script;
        }
    }

    /// Simulate every browser created so far dying.
    pub fn kill_browsers(&self) {
        if let Ok(browsers) = self.shared.browsers.lock() {
            for browser in browsers.iter() {
                browser.connected.store(false, Ordering::SeqCst);
            }
        }
    }

    pub fn launches(&self) -> usize {
        self.shared.counters.launches.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.shared.counters.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.shared.counters.disconnects.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.shared.counters.terminations.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ContextProbe> {
        self.shared
            .contexts
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn contexts_opened(&self) -> usize {
        self.contexts().len()
    }

    pub fn context_closes(&self) -> usize {
        self.contexts().iter().map(ContextProbe::close_count).sum()
    }

    fn new_browser(&self) -> Arc<FakeBrowser> {
        let browser = Arc::new(FakeBrowser {
            connected: AtomicBool::new(true),
            shared: Arc::clone(&self.shared),
        });
        if let Ok(mut browsers) = self.shared.browsers.lock() {
            browsers.push(Arc::clone(&browser));
        }
        browser
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(
        &self,
        _options: &LaunchOptions,
        _config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        self.shared.counters.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.launch_delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = self
            .failing_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(BrowserError::LaunchFailed("chromium exited with code 1".into()));
        }
        Ok(self.new_browser())
    }

    async fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        _config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        self.shared.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(BrowserError::ConnectFailed {
                endpoint: endpoint.as_str().to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.new_browser())
    }
}
