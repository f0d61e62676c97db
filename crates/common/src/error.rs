use std::fmt;

use serde::Serialize;

/// Failure taxonomy shared by every layer that can end a request.
///
/// The HTTP layer derives the status code from this alone, so new error
/// types only need to say which bucket they fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or contradictory browser-acquisition settings. Never retried.
    Configuration,
    /// Browser unreachable, launch failure, connection lost mid-request.
    Infrastructure,
    /// Navigation timeout or network failure reaching the target.
    Navigation,
    /// The page rendered but no article-like content was found.
    Content,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Infrastructure => "infrastructure",
            Self::Navigation => "navigation",
            Self::Content => "content",
        }
    }

    /// Content failures are an expected outcome for some inputs and are
    /// logged below error level.
    #[must_use]
    pub fn is_expected(self) -> bool {
        matches!(self, Self::Content)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by error types that can reach the request boundary.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Render the `source()` chain below `err`, one `caused by:` line per level.
///
/// Returns `None` when the error has no source.
pub fn source_chain(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        lines.push(format!("caused by: {source}"));
        current = source.source();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure")]
    struct Inner(#[source] std::io::Error);

    #[test]
    fn source_chain_walks_every_level() {
        let err = Outer(Inner(std::io::Error::other("socket reset")));
        let chain = source_chain(&err).unwrap();
        assert_eq!(
            chain,
            "caused by: inner failure\ncaused by: socket reset"
        );
    }

    #[test]
    fn source_chain_is_none_without_sources() {
        let err = std::io::Error::other("flat");
        assert!(source_chain(&err).is_none());
    }

    #[test]
    fn only_content_is_expected() {
        assert!(ErrorKind::Content.is_expected());
        assert!(!ErrorKind::Navigation.is_expected());
        assert!(!ErrorKind::Infrastructure.is_expected());
        assert!(!ErrorKind::Configuration.is_expected());
    }
}
