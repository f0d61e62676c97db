//! Configuration loading, validation, env substitution, and environment overrides.
//!
//! Config files: `readproxy.toml`, `readproxy.yaml`, or `readproxy.json`
//! Searched in `./` then `~/.config/readproxy/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values. Individual
//! settings can also be overridden by the environment variables listed in
//! [`env`].

pub mod env;
pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    env::{apply_env_overrides, apply_env_overrides_with},
    loader::{discover_and_load, load_config},
    schema::{BrowserConfig, DiagnosticsConfig, FingerprintConfig, ProxyConfig, ServerConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
