//! Structured JSON diagnostics logger.
//!
//! The sink's own failures are reported here, one JSON object per line, on a
//! channel separate from the events being shipped to the store.

use crate::log_sink::LogSink;
use docsink_ports::{DiagnosticEvent, DiagnosticLevel, LogFields, LoggerPort};
use docsink_shared::{REDACTED, is_secret_key};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SERIALIZE_FAILED_LINE: &str = "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"diagnostic serialization failed\"}\n";

/// JSON logger emitting one line per diagnostic event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: DiagnosticLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: DiagnosticLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum diagnostic level.
    #[must_use]
    pub const fn with_min_level(mut self, level: DiagnosticLevel) -> Self {
        self.min_level = level;
        self
    }

    fn render(&self, event: DiagnosticEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        for (key, value) in &mut fields {
            redact_entry(key, value);
        }

        let mut payload = serde_json::Map::new();
        payload.insert("timestampMs".to_owned(), Value::from(now_epoch_ms()));
        payload.insert("level".to_owned(), Value::from(level_name(event.level)));
        payload.insert("event".to_owned(), Value::from(&*event.event));
        payload.insert(
            "message".to_owned(),
            Value::from(scrub_uri_credentials(&event.message)),
        );
        if !fields.is_empty() {
            let fields = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            payload.insert("fields".to_owned(), Value::Object(fields));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_owned(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| SERIALIZE_FAILED_LINE.to_owned(),
            |mut line| {
                line.push('\n');
                line
            },
        )
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: DiagnosticEvent) {
        if level_rank(event.level) < level_rank(self.min_level) {
            return;
        }
        let line = self.render(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

const fn level_rank(level: DiagnosticLevel) -> u8 {
    match level {
        DiagnosticLevel::Debug => 10,
        DiagnosticLevel::Info => 20,
        DiagnosticLevel::Warn => 30,
        DiagnosticLevel::Error => 40,
    }
}

const fn level_name(level: DiagnosticLevel) -> &'static str {
    match level {
        DiagnosticLevel::Debug => "debug",
        DiagnosticLevel::Info => "info",
        DiagnosticLevel::Warn => "warn",
        DiagnosticLevel::Error => "error",
    }
}

fn redact_entry(key: &str, value: &mut Value) {
    if is_secret_key(key) {
        *value = Value::from(REDACTED);
    } else {
        redact_value(value);
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                redact_entry(key, nested);
            }
        },
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        Value::String(text) => {
            if let Cow::Owned(scrubbed) = scrub_uri_credentials(text) {
                *text = scrubbed;
            }
        },
        _ => {},
    }
}

/// Replace the user-info part of any `scheme://user:pw@host` in `text`.
fn scrub_uri_credentials(text: &str) -> Cow<'_, str> {
    if !text.contains("://") {
        return Cow::Borrowed(text);
    }

    let mut output = String::with_capacity(text.len());
    let mut changed = false;
    let mut rest = text;
    while let Some(scheme_end) = rest.find("://") {
        let (head, tail) = rest.split_at(scheme_end + 3);
        output.push_str(head);
        let authority_end = tail
            .find(|ch: char| ch == '/' || ch == '?' || ch.is_whitespace())
            .unwrap_or(tail.len());
        let (authority, after) = tail.split_at(authority_end);
        if let Some(at) = authority.rfind('@') {
            let (_, host) = authority.split_at(at);
            output.push_str(REDACTED);
            output.push_str(host);
            changed = true;
        } else {
            output.push_str(authority);
        }
        rest = after;
    }
    output.push_str(rest);

    if changed {
        Cow::Owned(output)
    } else {
        Cow::Borrowed(text)
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
