//! Shared error classification and the diagnostics sink used across all readproxy crates.

pub mod diagnostics;
pub mod error;

pub use {
    diagnostics::{DiagnosticsConfig, DiagnosticsRecord, DiagnosticsSink},
    error::{Classify, ErrorKind},
};
