use std::{sync::Arc, time::Duration};

use {
    readproxy_browser::{
        BrowserEngine, ExtractionPipeline, Extractor, FingerprintProfile, ReadabilityExtractor,
        SessionConfig, SessionManager,
    },
    readproxy_common::{DiagnosticsConfig, DiagnosticsSink},
    readproxy_config::ProxyConfig,
};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub diagnostics: Arc<DiagnosticsSink>,
}

impl AppState {
    pub fn new(pipeline: Arc<ExtractionPipeline>, diagnostics: Arc<DiagnosticsSink>) -> Self {
        Self {
            pipeline,
            diagnostics,
        }
    }

    /// Wire the pipeline and diagnostics sink from validated configuration.
    pub fn from_config(config: &ProxyConfig, engine: Arc<dyn BrowserEngine>) -> Self {
        Self::with_extractor(config, engine, Arc::new(ReadabilityExtractor))
    }

    pub fn with_extractor(
        config: &ProxyConfig,
        engine: Arc<dyn BrowserEngine>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            SessionConfig::from(&config.browser),
            engine,
        ));
        let pipeline = ExtractionPipeline::new(
            sessions,
            extractor,
            FingerprintProfile::from(&config.fingerprint),
            Duration::from_millis(config.browser.navigation_timeout_ms),
        );
        let diagnostics = DiagnosticsSink::new(DiagnosticsConfig {
            verbose: config.diagnostics.verbose,
            truncate_limit: config.diagnostics.truncate_limit,
            error_log_path: config.diagnostics.error_log_path.clone(),
        });
        Self::new(Arc::new(pipeline), Arc::new(diagnostics))
    }
}
