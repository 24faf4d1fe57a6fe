//! Message content rules.

use crate::domain::foundation::ValidationError;

/// Trims and checks a user message.
///
/// Length is counted in characters, not bytes.
pub fn validate_content(raw: &str, max_len: usize) -> Result<String, ValidationError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    let len = content.chars().count();
    if len > max_len {
        return Err(ValidationError::too_long("content", max_len, len));
    }
    Ok(content.to_string())
}

/// Rough token count for text that has not been through a tokenizer.
///
/// Four characters per token, never less than one.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    ((chars + 3) / 4).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_content("  hello \n", 100).unwrap(), "hello");
    }

    #[test]
    fn rejects_blank() {
        assert!(matches!(
            validate_content(" \t\n", 100),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn length_counts_characters() {
        let text = "é".repeat(10);
        assert!(validate_content(&text, 10).is_ok());
        assert!(matches!(
            validate_content(&text, 9),
            Err(ValidationError::TooLong { max: 9, actual: 10, .. })
        ));
    }

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    proptest! {
        #[test]
        fn validated_content_is_never_blank_or_padded(s in "\\PC{0,200}") {
            if let Ok(content) = validate_content(&s, 200) {
                prop_assert!(!content.is_empty());
                prop_assert_eq!(content.trim(), content.as_str());
            }
        }
    }
}
