//! Property values attached to log events.
//!
//! A property value is a closed, recursive shape: a scalar leaf, an ordered
//! sequence, a named structure with ordered fields, or a dictionary keyed by
//! scalars. Scalars carry the native type they were captured with so the
//! mapper can pick the closest document representation.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::fmt::{self, Write as _};
use uuid::Uuid;

/// Leaf value captured from a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer up to 64 bits.
    I64(i64),
    /// Unsigned integer up to 64 bits.
    U64(u64),
    /// 128-bit signed integer.
    I128(i128),
    /// 128-bit unsigned integer.
    U128(u128),
    /// Floating point.
    F64(f64),
    /// Single character.
    Char(char),
    /// Text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Unique identifier.
    Uuid(Uuid),
    /// Instant in UTC.
    DateTime(DateTime<Utc>),
    /// Instant with its original offset.
    ZonedDateTime(DateTime<FixedOffset>),
    /// Elapsed time.
    Duration(TimeDelta),
    /// Calendar date without time.
    Date(NaiveDate),
    /// Time of day without date.
    Time(NaiveTime),
    /// Value of a type with no structured capture; holds its rendered text.
    Opaque(String),
}

/// A named field or event property.
#[derive(Debug, Clone, PartialEq)]
pub struct LogProperty {
    /// Property name as captured (not sanitized).
    pub name: String,
    /// Property value.
    pub value: PropertyValue,
}

impl LogProperty {
    /// Create a property.
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A captured object with ordered fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureValue {
    /// Optional type tag recorded at capture time.
    pub type_tag: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<LogProperty>,
}

impl StructureValue {
    /// Create an untagged structure.
    #[must_use]
    pub const fn new(fields: Vec<LogProperty>) -> Self {
        Self {
            type_tag: None,
            fields,
        }
    }

    /// Attach a type tag.
    #[must_use]
    pub fn with_type_tag(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }
}

/// Recursive property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Leaf value.
    Scalar(ScalarValue),
    /// Ordered elements.
    Sequence(Vec<PropertyValue>),
    /// Object with ordered fields.
    Structure(StructureValue),
    /// Key/value entries in capture order.
    Dictionary(Vec<(ScalarValue, PropertyValue)>),
}

impl PropertyValue {
    /// Nesting depth; scalars are depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Scalar(_) => 0,
            Self::Sequence(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Structure(structure) => {
                1 + structure
                    .fields
                    .iter()
                    .map(|field| field.value.depth())
                    .max()
                    .unwrap_or(0)
            },
            Self::Dictionary(entries) => {
                1 + entries
                    .iter()
                    .map(|(_, value)| value.depth())
                    .max()
                    .unwrap_or(0)
            },
        }
    }
}

/// Render a duration as `[-][d.]hh:mm:ss[.fffffff]` with 100 ns ticks.
#[must_use]
pub fn format_duration(delta: TimeDelta) -> String {
    let negative = delta < TimeDelta::zero();
    let magnitude = if negative { -delta } else { delta };
    let total_seconds = magnitude.num_seconds();
    let ticks = magnitude.subsec_nanos() / 100;

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        let _ = write!(out, "{days}.");
    }
    let _ = write!(out, "{hours:02}:{minutes:02}:{seconds:02}");
    if ticks > 0 {
        let _ = write!(out, ".{ticks:07}");
    }
    out
}

/// Render a time of day as `HH:MM:SS[.fraction]`.
#[must_use]
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

impl fmt::Display for ScalarValue {
    /// Text keeps its surrounding quotes; everything else renders bare.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::I64(value) => write!(formatter, "{value}"),
            Self::U64(value) => write!(formatter, "{value}"),
            Self::I128(value) => write!(formatter, "{value}"),
            Self::U128(value) => write!(formatter, "{value}"),
            Self::F64(value) => write!(formatter, "{value}"),
            Self::Char(value) => write!(formatter, "'{value}'"),
            Self::String(value) => {
                formatter.write_char('"')?;
                for ch in value.chars() {
                    if ch == '"' {
                        formatter.write_str("\\\"")?;
                    } else {
                        formatter.write_char(ch)?;
                    }
                }
                formatter.write_char('"')
            },
            Self::Bytes(bytes) => {
                for byte in bytes {
                    write!(formatter, "{byte:02x}")?;
                }
                Ok(())
            },
            Self::Uuid(value) => write!(formatter, "{value}"),
            Self::DateTime(value) => formatter.write_str(&value.to_rfc3339()),
            Self::ZonedDateTime(value) => formatter.write_str(&value.to_rfc3339()),
            Self::Duration(value) => formatter.write_str(&format_duration(*value)),
            Self::Date(value) => write!(formatter, "{}", value.format("%Y-%m-%d")),
            Self::Time(value) => formatter.write_str(&format_time_of_day(*value)),
            Self::Opaque(text) => formatter.write_str(text),
        }
    }
}

macro_rules! scalar_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for ScalarValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }

            impl From<$source> for PropertyValue {
                fn from(value: $source) -> Self {
                    Self::Scalar(ScalarValue::from(value))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => I64,
    i64 => I64,
    u32 => U64,
    u64 => U64,
    i128 => I128,
    u128 => U128,
    f64 => F64,
    char => Char,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => DateTime,
    DateTime<FixedOffset> => ZonedDateTime,
    TimeDelta => Duration,
    NaiveDate => Date,
    NaiveTime => Time,
}

impl From<ScalarValue> for PropertyValue {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<StructureValue> for PropertyValue {
    fn from(value: StructureValue) -> Self {
        Self::Structure(value)
    }
}

impl PropertyValue {
    /// Build a sequence from any iterator of convertible items.
    pub fn sequence<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Build a dictionary from key/value pairs.
    pub fn dictionary<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ScalarValue>,
        V: Into<Self>,
    {
        Self::Dictionary(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_use_tick_precision() {
        assert_eq!(format_duration(TimeDelta::seconds(90)), "00:01:30");
        assert_eq!(
            format_duration(TimeDelta::days(2) + TimeDelta::milliseconds(3_723_500)),
            "2.01:02:03.5000000"
        );
        assert_eq!(format_duration(-TimeDelta::nanoseconds(1_500)), "-00:00:00.0000015");
        assert_eq!(format_duration(TimeDelta::zero()), "00:00:00");
    }

    #[test]
    fn text_scalars_render_with_quotes() {
        assert_eq!(ScalarValue::from("key").to_string(), "\"key\"");
        assert_eq!(ScalarValue::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(ScalarValue::from(42_i64).to_string(), "42");
        assert_eq!(ScalarValue::Null.to_string(), "null");
    }

    #[test]
    fn depth_counts_container_levels() {
        let nested = PropertyValue::Sequence(vec![PropertyValue::Structure(StructureValue::new(
            vec![LogProperty::new("inner", 1_i64)],
        ))]);
        assert_eq!(nested.depth(), 2);
        assert_eq!(PropertyValue::from("leaf").depth(), 0);
    }
}
