//! Diagnostics sink for failures caught at the request boundary.
//!
//! [`DiagnosticsSink::record`] classifies an error into a
//! [`DiagnosticsRecord`], logs it (terse or verbose), optionally appends it
//! as a JSON line to a durable audit file, and hands back the truncated
//! message that is safe to put in an HTTP body. Source chains ("stack") go to
//! logs and the audit file only.

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use {
    serde::Serialize,
    tracing::{error, warn},
};

use crate::error::{Classify, ErrorKind, source_chain};

pub const DEFAULT_TRUNCATE_LIMIT: usize = 400;

#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    /// Log the full structured record (including the source chain) instead of
    /// the truncated one-liner.
    pub verbose: bool,
    /// Maximum length, in characters, of the terse/user-facing message.
    pub truncate_limit: usize,
    /// Append one JSON line per failure to this file when set.
    pub error_log_path: Option<PathBuf>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            truncate_limit: DEFAULT_TRUNCATE_LIMIT,
            error_log_path: None,
        }
    }
}

/// One caught failure. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsRecord {
    pub timestamp: String,
    #[serde(rename = "contextTags")]
    pub context_tags: BTreeMap<String, String>,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip)]
    pub truncated_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl DiagnosticsRecord {
    fn tags_display(&self) -> String {
        self.context_tags
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct DiagnosticsSink {
    config: DiagnosticsConfig,
    /// Lazily opened append-only writer for the audit file.
    writer: Mutex<Option<File>>,
}

impl DiagnosticsSink {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Build the record for `err` without any side effects.
    pub fn capture<E, I, K, V>(&self, err: &E, tags: I) -> DiagnosticsRecord
    where
        E: std::error::Error + Classify + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let message = err.to_string();
        DiagnosticsRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            context_tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            kind: err.kind(),
            truncated_message: truncate_message(&message, self.config.truncate_limit),
            message,
            stack: source_chain(err),
        }
    }

    /// Record a failure and return the message to show the caller.
    pub fn record<E, I, K, V>(&self, err: &E, tags: I) -> String
    where
        E: std::error::Error + Classify + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let record = self.capture(err, tags);
        self.emit(&record);
        if let Err(e) = self.append(&record) {
            warn!(error = %e, "failed to write durable error record");
        }
        record.truncated_message
    }

    fn emit(&self, record: &DiagnosticsRecord) {
        let tags = record.tags_display();
        if self.config.verbose {
            let full = serde_json::to_string(record).unwrap_or_else(|_| record.message.clone());
            if record.kind.is_expected() {
                warn!(kind = %record.kind, tags = %tags, record = %full, "request failed");
            } else {
                error!(kind = %record.kind, tags = %tags, record = %full, "request failed");
            }
        } else if record.kind.is_expected() {
            warn!(kind = %record.kind, tags = %tags, "{}", record.truncated_message);
        } else {
            error!(kind = %record.kind, tags = %tags, "{}", record.truncated_message);
        }
    }

    fn append(&self, record: &DiagnosticsRecord) -> std::io::Result<()> {
        let Some(path) = self.config.error_log_path.as_ref() else {
            return Ok(());
        };
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut guard = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("error log writer poisoned"))?;
        if guard.is_none() {
            *guard = Some(OpenOptions::new().create(true).append(true).open(path)?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }
}

/// Cap `message` at `limit` characters. A cut message ends in `…`, which
/// counts towards the limit.
pub fn truncate_message(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = message.chars().take(limit - 1).collect();
    out.push('…');
    out
}
