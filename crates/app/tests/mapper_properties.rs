//! Property and scenario tests for event-to-document mapping.

use bson::{Bson, Document};
use chrono::{TimeZone, Utc};
use docsink_app::mapper::fields;
use docsink_app::{MapperOptions, map_event};
use docsink_domain::{LogEvent, LogLevel, LogProperty, PropertyValue, StructureValue};
use proptest::prelude::*;
use std::error::Error;

fn event(level: LogLevel) -> LogEvent {
    let timestamp = Utc
        .timestamp_millis_opt(1_700_000_000_000)
        .single()
        .unwrap_or_default();
    LogEvent::new(timestamp, level, "order placed")
}

fn level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn nested(depth: usize) -> PropertyValue {
    (0..depth).fold(PropertyValue::from("leaf"), |inner, _| {
        StructureValue::new(vec![
            LogProperty::new("before", 1_i64),
            LogProperty::new("child", inner),
            LogProperty::new("after", 2_i64),
        ])
        .into()
    })
}

fn document_depth(value: &Bson) -> usize {
    match value {
        Bson::Document(document) => {
            1 + document.values().map(document_depth).max().unwrap_or_default()
        },
        Bson::Array(items) => items.iter().map(document_depth).max().unwrap_or_default(),
        _ => 0,
    }
}

proptest! {
    #[test]
    fn level_filter_matches_ordering(event_level in level(), minimum in level()) {
        let options = MapperOptions::new(minimum);
        let document = map_event(Some(&event(event_level)), &options);
        prop_assert_eq!(document.is_some(), event_level >= minimum);
    }

    #[test]
    fn property_names_are_always_storable(
        name in prop::collection::vec(any::<char>(), 0..12).prop_map(String::from_iter)
    ) {
        let options = MapperOptions::default().with_promoted_properties([name.as_str()]);
        let mapped = event(LogLevel::Information).with_property(name.clone(), true);
        let document = map_event(Some(&mapped), &options).unwrap_or_default();

        let properties = document.get_document(fields::PROPERTIES).cloned().unwrap_or_default();
        for key in document.keys().chain(properties.keys()) {
            prop_assert!(!key.is_empty());
            prop_assert!(!key.contains('.') && !key.contains('$'));
            prop_assert!(!key.chars().any(char::is_control));
        }
    }

    #[test]
    fn nesting_depth_is_preserved(depth in 1_usize..12) {
        let mapped = event(LogLevel::Information).with_property("payload", nested(depth));
        let document = map_event(Some(&mapped), &MapperOptions::default()).unwrap_or_default();
        let payload = document
            .get_document(fields::PROPERTIES)
            .ok()
            .and_then(|properties| properties.get("payload"))
            .cloned()
            .unwrap_or(Bson::Null);
        prop_assert_eq!(document_depth(&payload), depth);
    }
}

#[test]
fn nested_structures_keep_field_order() -> Result<(), Box<dyn Error>> {
    let mapped = event(LogLevel::Information).with_property("payload", nested(2));
    let document = map_event(Some(&mapped), &MapperOptions::default()).ok_or("document")?;

    let outer = document.get_document(fields::PROPERTIES)?.get_document("payload")?;
    let keys: Vec<_> = outer.keys().map(String::as_str).collect();
    assert_eq!(keys, ["before", "child", "after"]);
    let inner = outer.get_document("child")?;
    assert_eq!(inner.get_str("child")?, "leaf");
    Ok(())
}

#[test]
fn unsafe_names_are_sanitized_everywhere() -> Result<(), Box<dyn Error>> {
    let options = MapperOptions::default().with_promoted_properties(["a.b$c\0d"]);
    let mapped = event(LogLevel::Information)
        .with_property("a.b$c\0d", 1_i64)
        .with_property("", 2_i64);

    let document = map_event(Some(&mapped), &options).ok_or("document")?;
    assert_eq!(document.get_i64("a_b_c_d")?, 1);
    let properties = document.get_document(fields::PROPERTIES)?;
    assert_eq!(properties.get_i64("a_b_c_d")?, 1);
    assert_eq!(properties.get_i64("_")?, 2);
    Ok(())
}

#[test]
fn promoted_properties_are_duplicated_by_default() -> Result<(), Box<dyn Error>> {
    let options = MapperOptions::default().with_promoted_properties(["UserId"]);
    let mapped = event(LogLevel::Information)
        .with_property("userId", 42_i64)
        .with_property("Path", "/orders");

    let document = map_event(Some(&mapped), &options).ok_or("document")?;
    assert_eq!(document.get_i64("userId")?, 42);
    let properties = document.get_document(fields::PROPERTIES)?;
    assert_eq!(properties.get_i64("userId")?, 42);
    assert_eq!(properties.get_str("Path")?, "/orders");
    Ok(())
}

#[test]
fn deduplication_keeps_promoted_properties_top_level_only() -> Result<(), Box<dyn Error>> {
    let options = MapperOptions::default()
        .with_promoted_properties(["UserId"])
        .with_deduplication(true);
    let mapped = event(LogLevel::Information)
        .with_property("UserId", 42_i64)
        .with_property("Path", "/orders");

    let document = map_event(Some(&mapped), &options).ok_or("document")?;
    assert_eq!(document.get_i64("UserId")?, 42);
    let properties = document.get_document(fields::PROPERTIES)?;
    assert!(!properties.contains_key("UserId"));
    assert_eq!(properties.get_str("Path")?, "/orders");
    Ok(())
}

#[test]
fn core_fields_come_first() -> Result<(), Box<dyn Error>> {
    let mapped = event(LogLevel::Warning).with_property("Path", "/orders");
    let document: Document =
        map_event(Some(&mapped), &MapperOptions::default()).ok_or("document")?;

    let keys: Vec<_> = document.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [fields::TIMESTAMP, fields::LEVEL, fields::MESSAGE, fields::PROPERTIES]
    );
    assert_eq!(document.get_str(fields::LEVEL)?, "Warning");
    Ok(())
}
