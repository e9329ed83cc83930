//! Integration coverage for the event model.

use chrono::{TimeZone, Utc};
use docsink_domain::{
    DomainError, ExceptionInfo, LogEvent, LogLevel, LogProperty, PropertyValue, SpanId,
    StructureValue, TraceId,
};
use docsink_shared::ErrorEnvelope;
use proptest::prelude::*;

#[test]
fn domain_errors_map_into_error_envelopes() -> Result<(), Box<dyn std::error::Error>> {
    let Err(error) = "shouting".parse::<LogLevel>() else {
        return Err("unknown level should be rejected".into());
    };
    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.code.namespace(), "domain");
    assert_eq!(envelope.code.code(), "unknown_level");
    assert_eq!(envelope.metadata.get("input"), Some(&"shouting".to_string()));

    let Err(error) = "abc".parse::<TraceId>() else {
        return Err("short trace id should be rejected".into());
    };
    assert_eq!(error, DomainError::InvalidTraceId { input_length: 3 });
    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.metadata.get("input_length"), Some(&"3".to_string()));
    Ok(())
}

#[test]
fn builder_carries_trace_context_and_exception() -> Result<(), Box<dyn std::error::Error>> {
    let timestamp = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .ok_or("valid timestamp")?;
    let event = LogEvent::new(timestamp, LogLevel::Error, "checkout failed")
        .with_trace_id("4bf92f3577b34da6a3ce929d0e0e4736".parse()?)
        .with_span_id("00f067aa0ba902b7".parse::<SpanId>()?)
        .with_exception(ExceptionInfo::new("IOException", "disk"))
        .with_property(
            "Cart",
            StructureValue::new(vec![LogProperty::new("Items", 3_i64)]).with_type_tag("Cart"),
        );

    assert_eq!(
        event.trace_id.map(|id| id.to_hex()).as_deref(),
        Some("4bf92f3577b34da6a3ce929d0e0e4736")
    );
    assert!(event.span_id.is_some());
    assert!(matches!(
        event.property("Cart"),
        Some(PropertyValue::Structure(structure)) if structure.type_tag.as_deref() == Some("Cart")
    ));
    Ok(())
}

proptest! {
    #[test]
    fn level_order_matches_declaration_order(a in 0_usize..6, b in 0_usize..6) {
        let (Some(left), Some(right)) = (LogLevel::ALL.get(a), LogLevel::ALL.get(b)) else {
            return Err(TestCaseError::fail("index in range"));
        };
        prop_assert_eq!(left.cmp(right), a.cmp(&b));
    }

    #[test]
    fn level_names_round_trip(index in 0_usize..6) {
        let Some(level) = LogLevel::ALL.get(index) else {
            return Err(TestCaseError::fail("index in range"));
        };
        prop_assert_eq!(level.as_str().parse::<LogLevel>(), Ok(*level));
    }
}
