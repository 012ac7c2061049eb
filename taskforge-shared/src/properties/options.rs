/// Property options (`{"choices": [...]}`)
///
/// SELECT and MULTI_SELECT need a non-empty list of distinct, non-blank
/// choices. Every other type must not carry choices.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::PropertyType;

pub const MAX_CHOICES: usize = 100;
pub const MAX_CHOICE_LEN: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyOptions {
    #[serde(default)]
    pub choices: Vec<String>,
}

impl PropertyOptions {
    pub fn with_choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }

    /// Parses caller-supplied options; absent or `null` means no options
    pub fn from_json(raw: Option<JsonValue>) -> ServiceResult<Self> {
        match raw {
            None | Some(JsonValue::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ServiceError::invalid(format!("Invalid property options: {}", e))),
        }
    }

    /// Checks the options against the property type and trims choices
    pub fn validated_for(mut self, property_type: PropertyType) -> ServiceResult<Self> {
        self.choices = self.choices.iter().map(|c| c.trim().to_string()).collect();

        if !property_type.uses_choices() {
            if !self.choices.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "{} properties do not accept choices",
                    property_type
                )));
            }
            return Ok(self);
        }

        if self.choices.is_empty() {
            return Err(ServiceError::invalid(format!(
                "{} properties require at least one choice",
                property_type
            )));
        }
        if self.choices.len() > MAX_CHOICES {
            return Err(ServiceError::invalid(format!(
                "At most {} choices are allowed",
                MAX_CHOICES
            )));
        }

        let mut seen = HashSet::with_capacity(self.choices.len());
        for choice in &self.choices {
            if choice.is_empty() {
                return Err(ServiceError::invalid("Choices must not be blank"));
            }
            if choice.chars().count() > MAX_CHOICE_LEN {
                return Err(ServiceError::invalid(format!(
                    "Choices must be at most {} characters",
                    MAX_CHOICE_LEN
                )));
            }
            if !seen.insert(choice.as_str()) {
                return Err(ServiceError::invalid(format!("Duplicate choice '{}'", choice)));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_select_requires_choices() {
        let err = PropertyOptions::default()
            .validated_for(PropertyType::Select)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_choices_trimmed_and_distinct() {
        let options = PropertyOptions::with_choices([" low ", "high"])
            .validated_for(PropertyType::MultiSelect)
            .unwrap();
        assert_eq!(options.choices, vec!["low", "high"]);

        let err = PropertyOptions::with_choices(["a", " a"])
            .validated_for(PropertyType::Select)
            .unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn test_blank_choice_rejected() {
        assert!(PropertyOptions::with_choices(["ok", "   "])
            .validated_for(PropertyType::Select)
            .is_err());
    }

    #[test]
    fn test_non_select_rejects_choices() {
        assert!(PropertyOptions::with_choices(["x"])
            .validated_for(PropertyType::Text)
            .is_err());
        assert!(PropertyOptions::default()
            .validated_for(PropertyType::Number)
            .is_ok());
    }

    #[test]
    fn test_from_json() {
        assert_eq!(PropertyOptions::from_json(None).unwrap(), PropertyOptions::default());
        assert_eq!(
            PropertyOptions::from_json(Some(json!({"choices": ["a", "b"]}))).unwrap(),
            PropertyOptions::with_choices(["a", "b"])
        );
        assert!(PropertyOptions::from_json(Some(json!({"colour": "red"}))).is_err());
        assert!(PropertyOptions::from_json(Some(json!({"choices": "a"}))).is_err());
    }
}
