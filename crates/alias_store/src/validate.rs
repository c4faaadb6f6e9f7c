use serde_json::Value;

use crate::error::AliasError;

pub const MAX_ALIAS_LENGTH: usize = 128;

/// Names the command surface claims as subcommands.
pub const RESERVED_ALIAS_NAMES: [&str; 6] = ["list", "help", "remove", "delete", "create", "set"];

#[must_use]
pub fn is_alias_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[must_use]
pub fn has_valid_alias_chars(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_alias_char)
}

pub fn validate_alias_name(name: &str) -> Result<(), AliasError> {
    if name.trim().is_empty() {
        return Err(AliasError::EmptyName);
    }

    if !has_valid_alias_chars(name) {
        return Err(AliasError::InvalidCharacters {
            name: name.to_string(),
        });
    }

    // Only ASCII survives the character check, so bytes == chars here.
    if name.len() > MAX_ALIAS_LENGTH {
        return Err(AliasError::NameTooLong {
            len: name.len(),
            max: MAX_ALIAS_LENGTH,
        });
    }

    if RESERVED_ALIAS_NAMES.contains(&name) {
        return Err(AliasError::ReservedName {
            name: name.to_string(),
        });
    }

    Ok(())
}

pub fn validate_session_path(session_path: &str) -> Result<(), AliasError> {
    if session_path.trim().is_empty() {
        return Err(AliasError::EmptySessionPath);
    }

    Ok(())
}

/// Normalizes an untyped title: `null` and `""` clear the title, any other string is kept
/// verbatim, everything else is rejected.
pub fn normalize_title_value(title: &Value) -> Result<Option<String>, AliasError> {
    match title {
        Value::Null => Ok(None),
        Value::String(text) => Ok(normalize_title(Some(text))),
        other => Err(AliasError::InvalidTitleType {
            found: json_type_name(other),
        }),
    }
}

#[must_use]
pub fn normalize_title(title: Option<&str>) -> Option<String> {
    title.filter(|text| !text.is_empty()).map(str::to_string)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_letters_digits_dash_and_underscore() {
        assert_eq!(validate_alias_name("feature_x-2"), Ok(()));
    }

    #[test]
    fn blank_names_are_empty() {
        for name in ["", "   ", "\t\n"] {
            let error = validate_alias_name(name).expect_err("blank name must fail");
            assert!(error.to_string().contains("empty"), "{error}");
        }
    }

    #[test]
    fn punctuation_and_traversal_are_rejected() {
        for name in ["../etc", "a b", "a.b", "naïve", " padded", "x/y", "semi;colon"] {
            let error = validate_alias_name(name).expect_err("invalid chars must fail");
            assert!(error.to_string().contains("letters"), "{error}");
        }
    }

    #[test]
    fn length_limit_is_inclusive_at_128() {
        assert_eq!(validate_alias_name(&"a".repeat(128)), Ok(()));

        let error = validate_alias_name(&"a".repeat(129)).expect_err("129 chars must fail");
        assert!(error.to_string().contains("128"), "{error}");
    }

    #[test]
    fn reserved_names_are_exact_and_case_sensitive() {
        for name in RESERVED_ALIAS_NAMES {
            let error = validate_alias_name(name).expect_err("reserved name must fail");
            assert!(error.to_string().contains("reserved"), "{error}");
        }
        assert_eq!(validate_alias_name("List"), Ok(()));
        assert_eq!(validate_alias_name("listing"), Ok(()));
    }

    #[test]
    fn whitespace_only_session_path_is_empty() {
        assert_eq!(validate_session_path("  "), Err(AliasError::EmptySessionPath));
        assert_eq!(validate_session_path("/sessions/abc"), Ok(()));
    }

    #[test]
    fn title_values_normalize_or_fail_with_string_hint() {
        assert_eq!(normalize_title_value(&json!(null)), Ok(None));
        assert_eq!(normalize_title_value(&json!("")), Ok(None));
        assert_eq!(
            normalize_title_value(&json!(" keep spaces ")),
            Ok(Some(" keep spaces ".to_string()))
        );

        let error = normalize_title_value(&json!(42)).expect_err("numbers are not titles");
        assert!(error.to_string().contains("string"), "{error}");
    }
}
