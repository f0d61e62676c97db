//! One request, end to end: acquire, render, capture, extract.

use std::{sync::Arc, time::Duration};

use {
    readproxy_common::{Classify, ErrorKind},
    tokio::time::timeout,
    tracing::{debug, info},
};

use crate::{
    error::BrowserError,
    extract::{Article, ExtractError, Extractor},
    fingerprint::FingerprintProfile,
    session::{Session, SessionManager},
    target::Target,
};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("failed to parse rendered document: {0}")]
    Document(String),

    #[error("no readable content found")]
    NoContent,
}

impl From<ExtractError> for ExtractionError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Parse(msg) => Self::Document(msg),
        }
    }
}

impl ExtractionError {
    /// Message safe to hand back to HTTP callers, if the failure has one.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::NoContent => None,
            other => Some(other.to_string()),
        }
    }
}

impl Classify for ExtractionError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Browser(e) => e.kind(),
            Self::Document(_) => ErrorKind::Infrastructure,
            Self::NoContent => ErrorKind::Content,
        }
    }
}

pub struct ExtractionPipeline {
    sessions: Arc<SessionManager>,
    extractor: Arc<dyn Extractor>,
    profile: FingerprintProfile,
    navigation_timeout: Duration,
}

impl ExtractionPipeline {
    pub fn new(
        sessions: Arc<SessionManager>,
        extractor: Arc<dyn Extractor>,
        profile: FingerprintProfile,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            extractor,
            profile,
            navigation_timeout,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Render `target` and return its readable text.
    ///
    /// The rendering context is closed exactly once on every path, and a
    /// managed-remote connection is released exactly once.
    pub async fn extract(&self, target: &Target) -> Result<Article, ExtractionError> {
        let base = target.url().clone();
        let session = self.sessions.acquire().await?;
        let rendered = self.render(&session, target).await;
        session.release().await;
        let html = rendered?;
        debug!(target = %target, bytes = html.len(), "captured rendered document");

        let extractor = Arc::clone(&self.extractor);
        let article = tokio::task::spawn_blocking(move || extractor.extract(&html, &base))
            .await
            .map_err(|e| ExtractionError::Document(e.to_string()))??
            .ok_or(ExtractionError::NoContent)?;

        info!(
            target = %target,
            title = %article.title,
            chars = article.text.chars().count(),
            "extracted article"
        );
        Ok(article)
    }

    async fn render(&self, session: &Session, target: &Target) -> Result<String, BrowserError> {
        let mut ctx = session.open_context(&self.profile).await?;
        let captured = async {
            match timeout(self.navigation_timeout, ctx.navigate(target.as_str())).await {
                Ok(navigated) => navigated?,
                Err(_) => return Err(BrowserError::NavigationTimeout(self.navigation_timeout)),
            }
            ctx.content().await
        }
        .await;
        ctx.close().await;
        captured
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::{
        extract::ReadabilityExtractor,
        fake::{FakeEngine, FakeScript},
        types::{AcquisitionStrategy, LaunchOptions, RemoteEndpoint, SessionConfig},
    };

    const ARTICLE: &str = r#"<html><head><title>Field notes</title></head><body>
<nav>Home About Contact</nav>
<article>
<p>The tide came in faster than the charts suggested, and the survey team had to move the equipment twice before noon.</p>
<p>By evening the readings settled, and the notes from the morning finally lined up with the instruments on the ridge.</p>
</article>
</body></html>"#;

    const BLANK: &str = "<html><head></head><body></body></html>";

    const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(45);

    struct BrokenExtractor;

    impl Extractor for BrokenExtractor {
        fn extract(&self, _html: &str, _base: &Url) -> Result<Option<Article>, ExtractError> {
            Err(ExtractError::Parse("unexpected end of input".into()))
        }
    }

    fn local() -> SessionConfig {
        SessionConfig {
            strategy: AcquisitionStrategy::LocalProcess(LaunchOptions::default()),
            ignore_https_errors: true,
            request_timeout: NAVIGATION_TIMEOUT,
        }
    }

    fn remote() -> SessionConfig {
        SessionConfig {
            strategy: AcquisitionStrategy::ManagedRemote(RemoteEndpoint::ControlUrl(
                "http://browserless:3000".into(),
            )),
            ignore_https_errors: true,
            request_timeout: NAVIGATION_TIMEOUT,
        }
    }

    fn pipeline_with(
        config: SessionConfig,
        engine: &FakeEngine,
        extractor: Arc<dyn Extractor>,
    ) -> ExtractionPipeline {
        let sessions = Arc::new(SessionManager::new(config, Arc::new(engine.clone())));
        ExtractionPipeline::new(
            sessions,
            extractor,
            FingerprintProfile::default(),
            NAVIGATION_TIMEOUT,
        )
    }

    fn pipeline(config: SessionConfig, engine: &FakeEngine) -> ExtractionPipeline {
        pipeline_with(config, engine, Arc::new(ReadabilityExtractor))
    }

    fn target() -> Target {
        Target::resolve("/https://example.com/article").unwrap()
    }

    #[tokio::test]
    async fn success_returns_text_and_closes_context() {
        let engine = FakeEngine::new(FakeScript::serving(ARTICLE));
        let article = pipeline(local(), &engine).extract(&target()).await.unwrap();

        assert_eq!(
            article.text,
            "The tide came in faster than the charts suggested, and the survey team had to move \
             the equipment twice before noon.\n\n\
             By evening the readings settled, and the notes from the morning finally lined up \
             with the instruments on the ridge."
        );
        assert_eq!(article.title, "Field notes");
        assert_eq!(engine.contexts_opened(), 1);
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn navigates_to_target_after_profile() {
        let engine = FakeEngine::new(FakeScript::serving(ARTICLE));
        pipeline(local(), &engine).extract(&target()).await.unwrap();

        let calls = engine.contexts()[0].calls();
        assert_eq!(
            calls[5],
            crate::fake::ContextCall::Navigate("https://example.com/article".into())
        );
        assert_eq!(calls[6], crate::fake::ContextCall::Content);
    }

    #[tokio::test]
    async fn blank_page_is_content_failure() {
        let engine = FakeEngine::new(FakeScript::serving(BLANK));
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::NoContent));
        assert_eq!(err.kind(), ErrorKind::Content);
        assert_eq!(err.detail(), None);
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn titled_page_without_body_text_is_content_failure() {
        let engine = FakeEngine::new(FakeScript::serving(
            "<html><head><title>Example Domain</title></head><body></body></html>",
        ));
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::NoContent));
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_timeout_closes_context() {
        let engine = FakeEngine::new(FakeScript {
            navigation_delay: Some(Duration::from_secs(120)),
            ..FakeScript::serving(ARTICLE)
        });
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::Browser(BrowserError::NavigationTimeout(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Navigation);
        assert_eq!(
            err.detail().as_deref(),
            Some("navigation timed out after 45000ms")
        );
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn navigation_failure_closes_context() {
        let engine = FakeEngine::new(FakeScript {
            fail_navigation: Some("net::ERR_NAME_NOT_RESOLVED".into()),
            ..Default::default()
        });
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Navigation);
        assert!(err.detail().unwrap().contains("ERR_NAME_NOT_RESOLVED"));
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn capture_failure_closes_context() {
        let engine = FakeEngine::new(FakeScript {
            fail_content: true,
            ..Default::default()
        });
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn parse_failure_closes_context() {
        let engine = FakeEngine::new(FakeScript::serving(ARTICLE));
        let err = pipeline_with(local(), &engine, Arc::new(BrokenExtractor))
            .extract(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Document(_)));
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(engine.context_closes(), 1);
    }

    #[tokio::test]
    async fn context_open_failure_is_infrastructure() {
        let engine = FakeEngine::new(FakeScript {
            fail_open: true,
            ..Default::default()
        });
        let err = pipeline(local(), &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(engine.contexts_opened(), 0);
    }

    #[tokio::test]
    async fn disabled_launch_is_configuration_failure() {
        let engine = FakeEngine::new(FakeScript::serving(ARTICLE));
        let config = SessionConfig {
            strategy: AcquisitionStrategy::LocalProcess(LaunchOptions {
                allowed: false,
                ..Default::default()
            }),
            ..local()
        };
        let err = pipeline(config, &engine)
            .extract(&target())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.detail().unwrap().contains("BROWSERLESS_WS_ENDPOINT"));
        assert_eq!(engine.launches(), 0);
    }

    #[tokio::test]
    async fn remote_mode_disconnects_once_per_request() {
        let engine = FakeEngine::new(FakeScript::serving(ARTICLE));
        let pipeline = pipeline(remote(), &engine);

        pipeline.extract(&target()).await.unwrap();
        engine.set_script(FakeScript::serving(BLANK));
        pipeline.extract(&target()).await.unwrap_err();
        engine.set_script(FakeScript {
            fail_navigation: Some("net::ERR_CONNECTION_RESET".into()),
            ..Default::default()
        });
        pipeline.extract(&target()).await.unwrap_err();

        assert_eq!(engine.connects(), 3);
        assert_eq!(engine.disconnects(), 3);
        assert_eq!(engine.context_closes(), 3);
        assert_eq!(engine.launches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_still_closes_context() {
        let engine = FakeEngine::new(FakeScript {
            navigation_delay: Some(Duration::from_secs(30)),
            ..FakeScript::serving(ARTICLE)
        });
        let pipeline = pipeline(remote(), &engine);

        let cancelled = timeout(Duration::from_secs(1), pipeline.extract(&target())).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.context_closes(), 1);
        assert_eq!(engine.disconnects(), 1);
    }
}
