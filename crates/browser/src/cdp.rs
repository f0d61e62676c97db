//! Chromium over the DevTools protocol, via chromiumoxide.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Handler, Page,
        cdp::browser_protocol::{
            emulation::{SetDeviceMetricsOverrideParams, SetTimezoneOverrideParams},
            network::{Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams},
            page::{
                AddScriptToEvaluateOnNewDocumentParams, EventLifecycleEvent,
                SetLifecycleEventsEnabledParams,
            },
        },
        handler::{HandlerConfig, viewport::Viewport as CdpViewport},
    },
    futures::StreamExt,
    tokio::{sync::RwLock, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    detect,
    engine::{BrowserEngine, BrowserHandle, RenderingContext},
    error::BrowserError,
    types::{LaunchOptions, RemoteEndpoint, SessionConfig, Viewport},
};

/// Lifecycle event Chromium emits once at most two connections have been
/// idle for 500ms.
const NETWORK_ALMOST_IDLE: &str = "networkAlmostIdle";

/// Engine backed by a real Chromium.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpEngine;

#[async_trait]
impl BrowserEngine for CdpEngine {
    async fn launch(
        &self,
        options: &LaunchOptions,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        let executable = detect::detect_browser(options.chrome_path.as_deref())
            .map_err(BrowserError::BrowserNotAvailable)?;

        // chromiumoxide is headless unless told otherwise.
        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(&executable)
            .viewport(None::<CdpViewport>)
            .request_timeout(config.request_timeout)
            .args(options.args());
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let cdp_config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        info!(
            executable = %executable.display(),
            headless = options.headless,
            "launching local browser"
        );
        let (browser, handler) = Browser::launch(cdp_config).await.map_err(|e| {
            BrowserError::LaunchFailed(format!("{e}\n\n{}", detect::install_instructions()))
        })?;
        Ok(Arc::new(CdpBrowser::spawn(browser, handler)))
    }

    async fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        // The viewport is set per context, never forced at connect time.
        let handler_config = HandlerConfig {
            ignore_https_errors: config.ignore_https_errors,
            viewport: None,
            request_timeout: config.request_timeout,
            ..Default::default()
        };
        // A control URL is resolved to its WebSocket through /json/version.
        let (browser, handler) = Browser::connect_with_config(endpoint.as_str(), handler_config)
            .await
            .map_err(|e| BrowserError::ConnectFailed {
                endpoint: endpoint.as_str().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(CdpBrowser::spawn(browser, handler)))
    }
}

/// A launched or connected Chromium plus its event-loop task.
pub struct CdpBrowser {
    browser: RwLock<Option<Browser>>,
    connected: Arc<AtomicBool>,
    handler: JoinHandle<()>,
}

impl CdpBrowser {
    fn spawn(browser: Browser, mut handler: Handler) -> Self {
        let connected = Arc::new(AtomicBool::new(true));
        let alive = Arc::clone(&connected);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler error");
                }
            }
            alive.store(false, Ordering::SeqCst);
            debug!("browser event handler exited (connection closed)");
        });
        Self {
            browser: RwLock::new(Some(browser)),
            connected,
            handler,
        }
    }
}

#[async_trait]
impl BrowserHandle for CdpBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn open_context(&self) -> Result<Box<dyn RenderingContext>, BrowserError> {
        let guard = self.browser.read().await;
        let browser = guard.as_ref().ok_or(BrowserError::ConnectionClosed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ContextFailed(e.to_string()))?;
        Ok(Box::new(CdpContext { page }))
    }

    async fn disconnect(&self) -> Result<(), BrowserError> {
        // Dropping a connected Browser closes the socket and leaves the
        // remote process alone.
        drop(self.browser.write().await.take());
        self.handler.abort();
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.write().await.take() else {
            return Ok(());
        };
        self.connected.store(false, Ordering::SeqCst);

        let closed = browser.close().await;
        let result = match closed {
            Ok(_) => browser
                .wait()
                .await
                .map(|_| ())
                .map_err(|e| BrowserError::Cdp(e.to_string())),
            Err(e) => {
                warn!(error = %e, "browser did not close, killing process");
                match browser.kill().await {
                    Some(Err(kill_err)) => Err(BrowserError::Cdp(kill_err.to_string())),
                    _ => Err(e.into()),
                }
            },
        };
        self.handler.abort();
        result
    }
}

impl Drop for CdpBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// One tab.
pub struct CdpContext {
    page: Page,
}

impl CdpContext {
    async fn wait_for_network_idle(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await?;
        let mut events = self.page.event_listener::<EventLifecycleEvent>().await?;

        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        let main_frame = self.page.mainframe().await?;

        // Events replayed for about:blank come before the new document's "init".
        let mut fresh = false;
        while let Some(event) = events.next().await {
            if main_frame.as_ref().is_some_and(|id| *id != event.frame_id) {
                continue;
            }
            match event.name.as_str() {
                "init" => fresh = true,
                NETWORK_ALMOST_IDLE if fresh => return Ok(()),
                _ => {},
            }
        }
        Err(BrowserError::NavigationFailed(
            "page closed before the network settled".into(),
        ))
    }
}

#[async_trait]
impl RenderingContext for CdpContext {
    async fn set_user_agent(
        &mut self,
        user_agent: &str,
        accept_language: &str,
        platform: &str,
    ) -> Result<(), BrowserError> {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .accept_language(accept_language)
            .platform(platform)
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), BrowserError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn set_extra_headers(&mut self, headers: &[(&str, &str)]) -> Result<(), BrowserError> {
        let map: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
            .collect();
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(
                serde_json::Value::Object(map),
            )))
            .await?;
        Ok(())
    }

    async fn set_timezone(&mut self, timezone: &str) -> Result<(), BrowserError> {
        self.page
            .execute(SetTimezoneOverrideParams::new(timezone))
            .await?;
        Ok(())
    }

    async fn add_init_script(&mut self, source: &str) -> Result<(), BrowserError> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.wait_for_network_idle(url).await.map_err(|e| match e {
            BrowserError::Cdp(msg) => BrowserError::NavigationFailed(msg),
            other => other,
        })
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::CaptureFailed(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.page.close().await?;
        Ok(())
    }
}
