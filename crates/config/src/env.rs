//! Environment variable overrides.
//!
//! | Variable | Setting |
//! |---|---|
//! | `PORT` | `server.port` |
//! | `BROWSERLESS_WS_ENDPOINT` | `browser.ws_endpoint` |
//! | `BROWSERLESS_URL` | `browser.control_url` |
//! | `ALLOW_LOCAL_LAUNCH` | `browser.allow_local_launch` |
//! | `SKIP_LOCAL_BROWSER` | `browser.skip_local_binary` |
//! | `CHROME_EXECUTABLE_PATH` | `browser.chrome_path` |
//! | `USER_DATA_DIR` | `browser.user_data_dir` |
//! | `HEADLESS` | `browser.headless` |
//! | `NAVIGATION_TIMEOUT_MS` | `browser.navigation_timeout_ms` |
//! | `USER_AGENT` | `fingerprint.user_agent` |
//! | `ACCEPT_LANGUAGE` | `fingerprint.accept_language` |
//! | `TIMEZONE` | `fingerprint.timezone` |
//! | `VIEWPORT_WIDTH` / `VIEWPORT_HEIGHT` | `fingerprint.viewport_*` |
//! | `DEVICE_SCALE_FACTOR` | `fingerprint.device_scale_factor` |
//! | `VERBOSE_ERRORS` | `diagnostics.verbose` |
//! | `ERROR_LOG_PATH` | `diagnostics.error_log_path` |
//! | `LOG_TRUNCATE_LIMIT` | `diagnostics.truncate_limit` |
//!
//! Blank values are ignored. Values that fail to parse are ignored with a
//! warning so a typo never silently zeroes a setting.

use std::{path::PathBuf, str::FromStr};

use tracing::warn;

use crate::schema::ProxyConfig;

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut ProxyConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides using a custom lookup function.
pub fn apply_env_overrides_with(config: &mut ProxyConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(port) = parsed(&get, "PORT") {
        config.server.port = port;
    }

    let browser = &mut config.browser;
    if let Some(ws) = get("BROWSERLESS_WS_ENDPOINT") {
        browser.ws_endpoint = Some(ws);
    }
    if let Some(url) = get("BROWSERLESS_URL") {
        browser.control_url = Some(url);
    }
    if let Some(allow) = flag(&get, "ALLOW_LOCAL_LAUNCH") {
        browser.allow_local_launch = allow;
    }
    if let Some(skip) = flag(&get, "SKIP_LOCAL_BROWSER") {
        browser.skip_local_binary = skip;
    }
    if let Some(path) = get("CHROME_EXECUTABLE_PATH") {
        browser.chrome_path = Some(path);
    }
    if let Some(dir) = get("USER_DATA_DIR") {
        browser.user_data_dir = Some(PathBuf::from(dir));
    }
    if let Some(headless) = flag(&get, "HEADLESS") {
        browser.headless = headless;
    }
    if let Some(ms) = parsed(&get, "NAVIGATION_TIMEOUT_MS") {
        browser.navigation_timeout_ms = ms;
    }

    let fp = &mut config.fingerprint;
    if let Some(ua) = get("USER_AGENT") {
        fp.user_agent = ua;
    }
    if let Some(lang) = get("ACCEPT_LANGUAGE") {
        fp.accept_language = lang;
    }
    if let Some(tz) = get("TIMEZONE") {
        fp.timezone = tz;
    }
    if let Some(w) = parsed(&get, "VIEWPORT_WIDTH") {
        fp.viewport_width = w;
    }
    if let Some(h) = parsed(&get, "VIEWPORT_HEIGHT") {
        fp.viewport_height = h;
    }
    if let Some(scale) = parsed(&get, "DEVICE_SCALE_FACTOR") {
        fp.device_scale_factor = scale;
    }

    let diag = &mut config.diagnostics;
    if let Some(verbose) = flag(&get, "VERBOSE_ERRORS") {
        diag.verbose = verbose;
    }
    if let Some(path) = get("ERROR_LOG_PATH") {
        diag.error_log_path = Some(PathBuf::from(path));
    }
    if let Some(limit) = parsed(&get, "LOG_TRUNCATE_LIMIT") {
        diag.truncate_limit = limit;
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = get(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable environment override");
            None
        },
    }
}

fn flag(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let raw = get(name)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(var = name, value = %raw, "ignoring unparsable boolean override");
            None
        },
    }
}
