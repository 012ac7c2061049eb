/// Type-directed validation of property values
///
/// | Type | Accepted JSON |
/// |------|---------------|
/// | TEXT | string |
/// | NUMBER | finite number |
/// | DATE | `"YYYY-MM-DD"` |
/// | DATETIME | RFC 3339 string |
/// | SELECT | string from `choices` |
/// | MULTI_SELECT | array of distinct strings from `choices` |
/// | USER | UUID string (membership is checked by the caller) |
///
/// `null` is never a value; removing a value is a separate operation.

use chrono::{DateTime, NaiveDate};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use uuid::Uuid;

use super::options::PropertyOptions;
use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::PropertyType;

pub const MAX_TEXT_LEN: usize = 10_000;

/// A value that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedValue {
    /// Normalized JSON to store
    pub value: JsonValue,

    /// Referenced user for USER properties
    pub user_id: Option<Uuid>,
}

impl ValidatedValue {
    fn plain(value: JsonValue) -> Self {
        Self {
            value,
            user_id: None,
        }
    }
}

fn expect_str<'a>(value: &'a JsonValue, property_type: PropertyType) -> ServiceResult<&'a str> {
    value.as_str().ok_or_else(|| {
        ServiceError::invalid(format!("{} properties take a string value", property_type))
    })
}

/// Validates `value` against a property's type and options
pub fn validate_value(
    property_type: PropertyType,
    options: &PropertyOptions,
    value: JsonValue,
) -> ServiceResult<ValidatedValue> {
    if value.is_null() {
        return Err(ServiceError::invalid(
            "Property values cannot be null; clear the value instead",
        ));
    }

    match property_type {
        PropertyType::Text => {
            let text = expect_str(&value, property_type)?;
            if text.chars().count() > MAX_TEXT_LEN {
                return Err(ServiceError::invalid(format!(
                    "Text values must be at most {} characters",
                    MAX_TEXT_LEN
                )));
            }
            Ok(ValidatedValue::plain(value))
        }
        PropertyType::Number => match value.as_f64() {
            Some(n) if n.is_finite() => Ok(ValidatedValue::plain(value)),
            _ => Err(ServiceError::invalid("NUMBER properties take a finite number")),
        },
        PropertyType::Date => {
            let text = expect_str(&value, property_type)?;
            if text.len() != 10 || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
                return Err(ServiceError::invalid(format!(
                    "Invalid date '{}'; expected YYYY-MM-DD",
                    text
                )));
            }
            Ok(ValidatedValue::plain(value))
        }
        PropertyType::Datetime => {
            let text = expect_str(&value, property_type)?;
            DateTime::parse_from_rfc3339(text).map_err(|_| {
                ServiceError::invalid(format!("Invalid datetime '{}'; expected RFC 3339", text))
            })?;
            Ok(ValidatedValue::plain(value))
        }
        PropertyType::Select => {
            let choice = expect_str(&value, property_type)?;
            if !options.contains(choice) {
                return Err(ServiceError::invalid(format!("'{}' is not a valid choice", choice)));
            }
            Ok(ValidatedValue::plain(value))
        }
        PropertyType::MultiSelect => {
            check_multi_select(options, &value)?;
            Ok(ValidatedValue::plain(value))
        }
        PropertyType::User => {
            let raw = expect_str(&value, property_type)?;
            let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
                ServiceError::invalid(format!("'{}' is not a valid user id", raw))
            })?;
            Ok(ValidatedValue {
                value: JsonValue::String(user_id.to_string()),
                user_id: Some(user_id),
            })
        }
    }
}

fn check_multi_select(options: &PropertyOptions, value: &JsonValue) -> ServiceResult<()> {
    let items = value.as_array().ok_or_else(|| {
        ServiceError::invalid("MULTI_SELECT properties take an array of choices")
    })?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        let choice = item
            .as_str()
            .ok_or_else(|| ServiceError::invalid("MULTI_SELECT entries must be strings"))?;
        if !options.contains(choice) {
            return Err(ServiceError::invalid(format!(
                "'{}' is not a valid choice",
                choice
            )));
        }
        if !seen.insert(choice) {
            return Err(ServiceError::invalid(format!(
                "Choice '{}' selected more than once",
                choice
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn none() -> PropertyOptions {
        PropertyOptions::default()
    }

    fn colours() -> PropertyOptions {
        PropertyOptions::with_choices(["red", "green", "blue"])
    }

    fn rejects(property_type: PropertyType, options: &PropertyOptions, value: JsonValue) {
        let err = validate_value(property_type, options, value.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{:?} accepted {}", property_type, value);
    }

    #[test]
    fn test_null_rejected_for_every_type() {
        for property_type in [
            PropertyType::Text,
            PropertyType::Number,
            PropertyType::Date,
            PropertyType::Datetime,
            PropertyType::Select,
            PropertyType::MultiSelect,
            PropertyType::User,
        ] {
            rejects(property_type, &colours(), JsonValue::Null);
        }
    }

    #[test]
    fn test_text_and_number() {
        assert!(validate_value(PropertyType::Text, &none(), json!("hello")).is_ok());
        rejects(PropertyType::Text, &none(), json!(42));
        rejects(PropertyType::Text, &none(), json!("x".repeat(MAX_TEXT_LEN + 1)));

        assert!(validate_value(PropertyType::Number, &none(), json!(3.5)).is_ok());
        assert!(validate_value(PropertyType::Number, &none(), json!(-7)).is_ok());
        rejects(PropertyType::Number, &none(), json!("3.5"));
    }

    #[test]
    fn test_dates() {
        assert!(validate_value(PropertyType::Date, &none(), json!("2025-02-28")).is_ok());
        rejects(PropertyType::Date, &none(), json!("2025-02-30"));
        rejects(PropertyType::Date, &none(), json!("2025-2-3"));
        rejects(PropertyType::Date, &none(), json!("28/02/2025"));

        assert!(
            validate_value(PropertyType::Datetime, &none(), json!("2025-02-28T10:00:00Z")).is_ok()
        );
        assert!(validate_value(
            PropertyType::Datetime,
            &none(),
            json!("2025-02-28T10:00:00+02:00")
        )
        .is_ok());
        rejects(PropertyType::Datetime, &none(), json!("2025-02-28 10:00"));
    }

    #[test]
    fn test_select() {
        assert!(validate_value(PropertyType::Select, &colours(), json!("red")).is_ok());
        rejects(PropertyType::Select, &colours(), json!("purple"));
        rejects(PropertyType::Select, &colours(), json!(["red"]));
    }

    #[test]
    fn test_multi_select() {
        assert!(validate_value(PropertyType::MultiSelect, &colours(), json!(["red", "blue"])).is_ok());
        assert!(validate_value(PropertyType::MultiSelect, &colours(), json!([])).is_ok());
        rejects(PropertyType::MultiSelect, &colours(), json!(["red", "red"]));
        rejects(PropertyType::MultiSelect, &colours(), json!(["red", "pink"]));
        rejects(PropertyType::MultiSelect, &colours(), json!("red"));
        rejects(PropertyType::MultiSelect, &colours(), json!([1]));
    }

    #[test]
    fn test_user_normalized() {
        let id = Uuid::new_v4();
        let validated = validate_value(
            PropertyType::User,
            &none(),
            json!(id.to_string().to_uppercase()),
        )
        .unwrap();
        assert_eq!(validated.user_id, Some(id));
        assert_eq!(validated.value, json!(id.to_string()));

        rejects(PropertyType::User, &none(), json!("not-a-uuid"));
    }
}
