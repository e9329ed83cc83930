//! Property value conversion.

use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use chrono::{NaiveTime, TimeZone};
use docsink_domain::{
    LogProperty, PropertyValue, ScalarValue, StructureValue, format_duration, format_time_of_day,
    sanitize_field_name,
};

/// Field carrying a structure's type tag.
pub const TYPE_TAG_FIELD: &str = "_typeTag";

/// Convert a property value, recursing into containers.
pub fn property_to_bson(value: &PropertyValue) -> Bson {
    match value {
        PropertyValue::Scalar(scalar) => scalar_to_bson(scalar),
        PropertyValue::Sequence(items) => Bson::Array(items.iter().map(property_to_bson).collect()),
        PropertyValue::Structure(structure) => Bson::Document(structure_to_document(structure)),
        PropertyValue::Dictionary(entries) => Bson::Document(dictionary_to_document(entries)),
    }
}

/// Build a document from properties, in order, with sanitized names.
pub fn properties_to_document<'a>(
    properties: impl IntoIterator<Item = &'a LogProperty>,
) -> Document {
    let mut document = Document::new();
    for property in properties {
        document.insert(
            sanitize_field_name(&property.name).into_owned(),
            property_to_bson(&property.value),
        );
    }
    document
}

/// Convert a scalar; values the store has no type for become strings.
pub fn scalar_to_bson(value: &ScalarValue) -> Bson {
    match value {
        ScalarValue::Null => Bson::Null,
        ScalarValue::Bool(value) => Bson::Boolean(*value),
        ScalarValue::I64(value) => Bson::Int64(*value),
        ScalarValue::U64(value) => {
            i64::try_from(*value).map_or_else(|_| Bson::String(value.to_string()), Bson::Int64)
        },
        ScalarValue::I128(value) => Bson::String(value.to_string()),
        ScalarValue::U128(value) => Bson::String(value.to_string()),
        ScalarValue::F64(value) => Bson::Double(*value),
        ScalarValue::Char(value) => Bson::String(value.to_string()),
        ScalarValue::String(value) => Bson::String(value.clone()),
        ScalarValue::Bytes(bytes) => binary(BinarySubtype::Generic, bytes.clone()),
        ScalarValue::Uuid(uuid) => binary(BinarySubtype::Uuid, uuid.as_bytes().to_vec()),
        ScalarValue::DateTime(instant) => date_time(instant),
        ScalarValue::ZonedDateTime(instant) => date_time(instant),
        ScalarValue::Duration(delta) => Bson::String(format_duration(*delta)),
        ScalarValue::Date(date) => date_time(&date.and_time(NaiveTime::MIN).and_utc()),
        ScalarValue::Time(time) => Bson::String(format_time_of_day(*time)),
        ScalarValue::Opaque(text) => Bson::String(text.clone()),
    }
}

/// Millisecond-precision store timestamp for any zoned instant.
pub fn date_time<Tz: TimeZone>(instant: &chrono::DateTime<Tz>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(instant.timestamp_millis()))
}

fn binary(subtype: BinarySubtype, bytes: Vec<u8>) -> Bson {
    Bson::Binary(Binary { subtype, bytes })
}

fn structure_to_document(structure: &StructureValue) -> Document {
    let mut document = Document::new();
    if let Some(type_tag) = structure.type_tag.as_ref() {
        document.insert(TYPE_TAG_FIELD, type_tag.clone());
    }
    for field in &structure.fields {
        document.insert(
            sanitize_field_name(&field.name).into_owned(),
            property_to_bson(&field.value),
        );
    }
    document
}

fn dictionary_to_document(entries: &[(ScalarValue, PropertyValue)]) -> Document {
    let mut document = Document::new();
    for (key, value) in entries {
        document.insert(
            sanitize_field_name(&key.to_string()).into_owned(),
            property_to_bson(value),
        );
    }
    document
}
