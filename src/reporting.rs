// src/reporting.rs
//! Structured error reporting
//!
//! Observer bugs must never disrupt the host's packet processing, so
//! failures on the notification path are turned into [`Report`] values and
//! handed to an [`ErrorReporter`] instead of propagating. Reporters are
//! fire-and-forget: the trait cannot fail the caller.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use tracing::error;

/// A category of report with a static message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportKind(&'static str);

impl ReportKind {
    pub const fn new(message: &'static str) -> Self {
        Self(message)
    }

    pub fn message(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One structured failure report.
#[derive(Debug, Clone)]
pub struct Report {
    kind: ReportKind,
    context: serde_json::Value,
    error: Option<String>,
    reported_at: DateTime<Utc>,
}

impl Report {
    pub fn builder(kind: ReportKind) -> ReportBuilder {
        ReportBuilder {
            kind,
            context: serde_json::Value::Null,
            error: None,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Caller-supplied context, e.g. the offending input.
    pub fn context(&self) -> &serde_json::Value {
        &self.context
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn reported_at(&self) -> DateTime<Utc> {
        self.reported_at
    }
}

/// Builder for [`Report`].
pub struct ReportBuilder {
    kind: ReportKind,
    context: serde_json::Value,
    error: Option<String>,
}

impl ReportBuilder {
    /// Attach caller context (the parameters in play when the failure hit).
    pub fn context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Attach the source error.
    pub fn error(mut self, error: &dyn Error) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn build(self) -> Report {
        Report {
            kind: self.kind,
            context: self.context,
            error: self.error,
            reported_at: Utc::now(),
        }
    }
}

/// Sink for failure reports. Must be callable from any I/O thread and must
/// never fail the caller.
pub trait ErrorReporter: Send + Sync {
    fn report_detailed(&self, source: &str, report: Report);
}

/// Reporter that emits every report through `tracing`.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_detailed(&self, source: &str, report: Report) {
        error!(
            source,
            kind = report.kind().message(),
            context = %report.context(),
            error = report.error(),
            "failure report"
        );
    }
}
