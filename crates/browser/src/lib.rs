//! Headless-browser rendering and readable-text extraction.
//!
//! A request flows through four pieces:
//!
//! - [`target::Target`] resolves the URL embedded in the request path
//! - [`session::SessionManager`] hands out a browser, either one shared
//!   local process or a fresh connection to a managed remote browser
//! - [`fingerprint::FingerprintProfile`] makes each rendering context look
//!   like an ordinary desktop browser
//! - [`pipeline::ExtractionPipeline`] navigates, captures the rendered HTML
//!   and runs readability extraction over it
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use readproxy_browser::{
//!     CdpEngine, ExtractionPipeline, FingerprintProfile, ReadabilityExtractor, SessionConfig,
//!     SessionManager, Target,
//! };
//!
//! let sessions = Arc::new(SessionManager::new(
//!     SessionConfig::from(&config.browser),
//!     Arc::new(CdpEngine),
//! ));
//! let pipeline = ExtractionPipeline::new(
//!     sessions,
//!     Arc::new(ReadabilityExtractor),
//!     FingerprintProfile::from(&config.fingerprint),
//!     Duration::from_millis(config.browser.navigation_timeout_ms),
//! );
//!
//! let target = Target::resolve("/https://example.com/article").unwrap();
//! let article = pipeline.extract(&target).await?;
//! ```

pub mod cdp;
pub mod detect;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod pipeline;
pub mod session;
pub mod target;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

pub use {
    cdp::CdpEngine,
    engine::{BrowserEngine, BrowserHandle, RenderingContext},
    error::BrowserError,
    extract::{Article, ExtractError, Extractor, ReadabilityExtractor},
    fingerprint::FingerprintProfile,
    pipeline::{ExtractionError, ExtractionPipeline},
    session::{ContextGuard, Session, SessionManager},
    target::Target,
    types::{AcquisitionStrategy, LaunchOptions, RemoteEndpoint, SessionConfig, SessionMode, Viewport},
};
