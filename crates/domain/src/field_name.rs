//! Document field-name rules.

use std::borrow::Cow;

/// Make `name` a legal document field name.
///
/// Every `.`, `$` and control character becomes `_`; an empty name becomes
/// `"_"`. Returns the input borrowed when it is already legal.
#[must_use]
pub fn sanitize_field_name(name: &str) -> Cow<'_, str> {
    if name.is_empty() {
        return Cow::Borrowed("_");
    }
    if !name.chars().any(is_forbidden) {
        return Cow::Borrowed(name);
    }
    Cow::Owned(
        name.chars()
            .map(|ch| if is_forbidden(ch) { '_' } else { ch })
            .collect(),
    )
}

/// True when `name` needs no sanitization.
#[must_use]
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(is_forbidden)
}

fn is_forbidden(ch: char) -> bool {
    matches!(ch, '.' | '$') || ch.is_control()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn replaces_dots_dollars_and_controls() {
        assert_eq!(sanitize_field_name("a.b$c\0d"), "a_b_c_d");
        assert_eq!(sanitize_field_name(""), "_");
        assert_eq!(sanitize_field_name("tab\there"), "tab_here");
    }

    #[test]
    fn legal_names_are_borrowed() {
        assert!(matches!(sanitize_field_name("UserId"), Cow::Borrowed("UserId")));
        assert!(matches!(sanitize_field_name("a.b"), Cow::Owned(_)));
    }

    proptest! {
        #[test]
        fn output_is_always_valid(name in any::<String>()) {
            let sanitized = sanitize_field_name(&name);
            prop_assert!(is_valid_field_name(&sanitized));
        }

        #[test]
        fn char_count_is_preserved(name in ".+") {
            let sanitized = sanitize_field_name(&name);
            prop_assert_eq!(sanitized.chars().count(), name.chars().count());
        }

        #[test]
        fn sanitizing_is_idempotent(name in any::<String>()) {
            let once = sanitize_field_name(&name).into_owned();
            let twice = sanitize_field_name(&once);
            prop_assert_eq!(twice.as_ref(), once.as_str());
        }
    }
}
