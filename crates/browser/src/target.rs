//! Resolve the URL embedded in an inbound request path.

use std::fmt;

use {
    tracing::warn,
    url::{Host, Url},
};

/// A URL ready to be rendered. Always starts with `http://` or `https://`
/// (case-insensitive) and always parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    url: Url,
}

impl Target {
    /// Resolve a raw request path (with query) such as
    /// `/https://example.com/a?b=1` or `/example.com/a`.
    ///
    /// A value that already carries an `http`/`https` scheme is kept exactly
    /// as typed, provided it parses with a host. Anything else gets
    /// `https://` prepended and must parse to a URL whose host looks real: it
    /// contains a dot, is an IP literal, or is `localhost`. No network access
    /// happens here.
    pub fn resolve(raw_path_and_query: &str) -> Option<Self> {
        let raw = raw_path_and_query
            .strip_prefix('/')
            .unwrap_or(raw_path_and_query);
        if raw.is_empty() {
            return None;
        }

        let decoded = match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                warn!(raw, error = %e, "failed to percent-decode target, using raw value");
                raw.to_string()
            },
        };
        if decoded.trim().is_empty() {
            return None;
        }

        if has_http_scheme(&decoded) {
            let url = Url::parse(&decoded).ok()?;
            url.host()?;
            return Some(Self { raw: decoded, url });
        }

        let url = Url::parse(&format!("https://{decoded}")).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !plausible_host(&url) {
            return None;
        }
        Some(Self {
            raw: url.as_str().to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed form, used as the base for resolving relative links.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn has_http_scheme(value: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn plausible_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.contains('.') || domain == "localhost",
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
        None => false,
    }
}
