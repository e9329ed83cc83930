//! Self-diagnostics boundary contract.
//!
//! The sink cannot report its own failures through the pipeline it feeds, so
//! it writes them to a separate diagnostics channel behind [`LoggerPort`].

use std::collections::BTreeMap;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

/// Additional event fields.
pub type LogFields = BTreeMap<Box<str>, serde_json::Value>;

/// One diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Stable event name.
    pub event: Box<str>,
    /// Severity.
    pub level: DiagnosticLevel,
    /// Human-readable message (safe, redacted).
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
    /// Optional error payload.
    pub error: Option<serde_json::Value>,
}

impl DiagnosticEvent {
    /// Build an event with no fields or error.
    pub fn new(level: DiagnosticLevel, event: &str, message: &str) -> Self {
        Self {
            event: event.into(),
            level,
            message: message.into(),
            fields: None,
            error: None,
        }
    }

    /// Attach fields.
    #[must_use]
    pub fn with_fields(mut self, fields: LogFields) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Attach an error payload.
    #[must_use]
    pub fn with_error(mut self, error: serde_json::Value) -> Self {
        self.error = Some(error);
        self
    }
}

/// Boundary contract for diagnostics logging.
pub trait LoggerPort: Send + Sync {
    /// Emit a structured event.
    fn log(&self, event: DiagnosticEvent);

    /// Create a child logger with base fields applied to every event.
    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort>;

    /// Convenience: debug event.
    fn debug(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(with_optional_fields(
            DiagnosticEvent::new(DiagnosticLevel::Debug, event, message),
            fields,
        ));
    }

    /// Convenience: info event.
    fn info(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(with_optional_fields(
            DiagnosticEvent::new(DiagnosticLevel::Info, event, message),
            fields,
        ));
    }

    /// Convenience: warn event.
    fn warn(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(with_optional_fields(
            DiagnosticEvent::new(DiagnosticLevel::Warn, event, message),
            fields,
        ));
    }

    /// Convenience: error event.
    fn error(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(with_optional_fields(
            DiagnosticEvent::new(DiagnosticLevel::Error, event, message),
            fields,
        ));
    }
}

fn with_optional_fields(event: DiagnosticEvent, fields: Option<LogFields>) -> DiagnosticEvent {
    match fields {
        Some(fields) => event.with_fields(fields),
        None => event,
    }
}
