//! Log event to store document mapping.
//!
//! Mapping is pure: no I/O, no failure. Values the store cannot represent
//! degrade to strings, and every field name written is sanitized.

mod exception;
mod values;

pub use exception::exception_to_document;
pub use values::{
    TYPE_TAG_FIELD, date_time, properties_to_document, property_to_bson, scalar_to_bson,
};

use bson::Document;
use docsink_config::SinkConfig;
use docsink_domain::{LogEvent, LogLevel, sanitize_field_name};
use std::collections::BTreeSet;

/// Top-level document field names.
pub mod fields {
    /// Event time, millisecond precision.
    pub const TIMESTAMP: &str = "Timestamp";
    /// Level name.
    pub const LEVEL: &str = "Level";
    /// Rendered message.
    pub const MESSAGE: &str = "Message";
    /// Trace id, lower-case hex.
    pub const TRACE_ID: &str = "TraceId";
    /// Span id, lower-case hex.
    pub const SPAN_ID: &str = "SpanId";
    /// Exception sub-document.
    pub const EXCEPTION: &str = "Exception";
    /// Property container.
    pub const PROPERTIES: &str = "Properties";

    /// Every name the mapper writes itself.
    pub const RESERVED: [&str; 7] = [
        TIMESTAMP, LEVEL, MESSAGE, TRACE_ID, SPAN_ID, EXCEPTION, PROPERTIES,
    ];
}

/// Mapping options derived from the sink config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    minimum_level: LogLevel,
    promoted: BTreeSet<String>,
    deduplicate_promoted: bool,
}

impl MapperOptions {
    /// Options with no promoted properties.
    #[must_use]
    pub const fn new(minimum_level: LogLevel) -> Self {
        Self {
            minimum_level,
            promoted: BTreeSet::new(),
            deduplicate_promoted: false,
        }
    }

    /// Options from a sink config.
    #[must_use]
    pub fn from_config(config: &SinkConfig) -> Self {
        Self::new(config.minimum_level)
            .with_promoted_properties(config.promoted_properties.iter())
            .with_deduplication(config.deduplicate_promoted_properties)
    }

    /// Promote these property names (matched case-insensitively).
    #[must_use]
    pub fn with_promoted_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.promoted = names
            .into_iter()
            .map(|name| name.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Drop promoted properties from `Properties`.
    #[must_use]
    pub const fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate_promoted = deduplicate;
        self
    }

    /// Events below this level are omitted.
    #[must_use]
    pub const fn minimum_level(&self) -> LogLevel {
        self.minimum_level
    }

    /// Whether `name` is promoted to the top level.
    #[must_use]
    pub fn is_promoted(&self, name: &str) -> bool {
        !self.promoted.is_empty() && self.promoted.contains(&name.to_lowercase())
    }
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self::new(LogLevel::Verbose)
    }
}

/// Map one event to a document; `None` when the event is absent or below
/// the minimum level.
pub fn map_event(event: Option<&LogEvent>, options: &MapperOptions) -> Option<Document> {
    let event = event?;
    if event.level < options.minimum_level {
        return None;
    }

    let mut document = Document::new();
    document.insert(fields::TIMESTAMP, date_time(&event.timestamp));
    document.insert(fields::LEVEL, event.level.as_str());
    document.insert(fields::MESSAGE, event.message.as_str());
    if let Some(trace_id) = event.trace_id {
        document.insert(fields::TRACE_ID, trace_id.to_hex());
    }
    if let Some(span_id) = event.span_id {
        document.insert(fields::SPAN_ID, span_id.to_hex());
    }
    if let Some(exception) = event.exception.as_ref() {
        document.insert(fields::EXCEPTION, exception_to_document(exception));
    }

    let promoted = event
        .properties
        .iter()
        .filter(|property| options.is_promoted(&property.name));
    for property in promoted {
        let name = sanitize_field_name(&property.name);
        // Promoted names never overwrite the mapper's own fields.
        if fields::RESERVED.iter().any(|reserved| *reserved == name) {
            continue;
        }
        document.insert(name.into_owned(), property_to_bson(&property.value));
    }

    let properties = properties_to_document(
        event
            .properties
            .iter()
            .filter(|property| {
                !(options.deduplicate_promoted && options.is_promoted(&property.name))
            }),
    );
    if !properties.is_empty() {
        document.insert(fields::PROPERTIES, properties);
    }

    Some(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docsink_domain::{ExceptionInfo, SpanId, TraceId};
    use std::error::Error;

    fn event(level: LogLevel) -> Result<LogEvent, Box<dyn Error>> {
        let timestamp = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .ok_or("timestamp")?;
        Ok(LogEvent::new(timestamp, level, "user signed in"))
    }

    #[test]
    fn absent_event_is_omitted() {
        assert!(map_event(None, &MapperOptions::default()).is_none());
    }

    #[test]
    fn timestamp_is_truncated_to_millis() -> Result<(), Box<dyn Error>> {
        let document = map_event(Some(&event(LogLevel::Information)?), &MapperOptions::default())
            .ok_or("document")?;

        let timestamp = document.get_datetime(fields::TIMESTAMP)?;
        assert_eq!(timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(document.get_str(fields::LEVEL)?, "Information");
        assert_eq!(document.get_str(fields::MESSAGE)?, "user signed in");
        Ok(())
    }

    #[test]
    fn trace_and_span_are_written_independently() -> Result<(), Box<dyn Error>> {
        let span_id: SpanId = "00f067aa0ba902b7".parse()?;
        let only_span = event(LogLevel::Information)?.with_span_id(span_id);
        let document = map_event(Some(&only_span), &MapperOptions::default()).ok_or("document")?;
        assert!(!document.contains_key(fields::TRACE_ID));
        assert_eq!(document.get_str(fields::SPAN_ID)?, "00f067aa0ba902b7");

        let trace_id: TraceId = "4bf92f3577b34da6a3ce929d0e0e4736".parse()?;
        let only_trace = event(LogLevel::Information)?.with_trace_id(trace_id);
        let document = map_event(Some(&only_trace), &MapperOptions::default()).ok_or("document")?;
        assert_eq!(
            document.get_str(fields::TRACE_ID)?,
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert!(!document.contains_key(fields::SPAN_ID));
        Ok(())
    }

    #[test]
    fn empty_property_container_is_omitted() -> Result<(), Box<dyn Error>> {
        let options = MapperOptions::default()
            .with_promoted_properties(["UserId"])
            .with_deduplication(true);
        let promoted_only = event(LogLevel::Information)?.with_property("userid", 7_i64);

        let document = map_event(Some(&promoted_only), &options).ok_or("document")?;
        assert!(!document.contains_key(fields::PROPERTIES));
        assert_eq!(document.get_i64("userid")?, 7);
        Ok(())
    }

    #[test]
    fn promoted_names_cannot_replace_core_fields() -> Result<(), Box<dyn Error>> {
        let options = MapperOptions::default().with_promoted_properties(["Message"]);
        let clashing = event(LogLevel::Information)?.with_property("Message", "shadow");

        let document = map_event(Some(&clashing), &options).ok_or("document")?;
        assert_eq!(document.get_str(fields::MESSAGE)?, "user signed in");
        assert_eq!(
            document.get_document(fields::PROPERTIES)?.get_str("Message")?,
            "shadow"
        );
        Ok(())
    }

    #[test]
    fn exception_is_written_as_sub_document() -> Result<(), Box<dyn Error>> {
        let failing = event(LogLevel::Error)?
            .with_exception(ExceptionInfo::new("IoError", "connection reset"));

        let document = map_event(Some(&failing), &MapperOptions::default()).ok_or("document")?;
        let exception = document.get_document(fields::EXCEPTION)?;
        assert_eq!(exception.get_str("Type")?, "IoError");
        Ok(())
    }

    #[test]
    fn options_follow_config() {
        let config = SinkConfig {
            minimum_level: LogLevel::Warning,
            promoted_properties: vec!["RequestId".into()],
            deduplicate_promoted_properties: true,
            ..SinkConfig::default()
        };

        let options = MapperOptions::from_config(&config);
        assert_eq!(options.minimum_level(), LogLevel::Warning);
        assert!(options.is_promoted("requestid"));
        assert!(!options.is_promoted("UserId"));
    }
}
