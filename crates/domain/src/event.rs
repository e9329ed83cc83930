//! Structured log events.

use crate::{ExceptionInfo, LogLevel, LogProperty, PropertyValue, SpanId, TraceId};
use chrono::{DateTime, Utc};

/// One structured log event as produced by the logging front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Message with properties already rendered in.
    pub message: String,
    /// Attached exception.
    pub exception: Option<ExceptionInfo>,
    /// Captured properties in capture order; names are unique.
    pub properties: Vec<LogProperty>,
    /// Distributed trace id.
    pub trace_id: Option<TraceId>,
    /// Distributed span id.
    pub span_id: Option<SpanId>,
}

impl LogEvent {
    /// Create an event with no exception, properties, or trace context.
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            exception: None,
            properties: Vec::new(),
            trace_id: None,
            span_id: None,
        }
    }

    /// Look up a property by exact name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    /// Attach an exception.
    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Add or replace a property, keeping the original position on replace.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let property = LogProperty::new(name, value);
        match self
            .properties
            .iter_mut()
            .find(|existing| existing.name == property.name)
        {
            Some(existing) => existing.value = property.value,
            None => self.properties.push(property),
        }
        self
    }

    /// Attach the trace id.
    #[must_use]
    pub const fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Attach the span id.
    #[must_use]
    pub const fn with_span_id(mut self, span_id: SpanId) -> Self {
        self.span_id = Some(span_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_property_replaces_in_place() {
        let event = LogEvent::new(Utc::now(), LogLevel::Information, "hello")
            .with_property("A", 1_i64)
            .with_property("B", 2_i64)
            .with_property("A", 3_i64);
        let names: Vec<_> = event.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(event.property("A"), Some(&PropertyValue::from(3_i64)));
    }
}
