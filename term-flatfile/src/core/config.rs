//! Declarative record, field, rule and map-function configuration.
//!
//! These types are produced by the host's configuration loader (usually from
//! JSON) and are read-only for the whole run. A [`FieldConfig`] is shared by
//! every [`Field`](super::Field) representing the same column across records.

use super::Severity;
use crate::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The kind of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationType {
    Regex,
    Equals,
    Sql,
    Api,
    Db,
    In,
    Date,
}

impl ValidationType {
    /// Returns the configuration tag of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::Regex => "REGEX",
            ValidationType::Equals => "EQUALS",
            ValidationType::Sql => "SQL",
            ValidationType::Api => "API",
            ValidationType::Db => "DB",
            ValidationType::In => "IN",
            ValidationType::Date => "DATE",
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared data type of a field, checked by the basic validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Numeric,
    Alphanumeric,
    Blank,
    #[default]
    Any,
}

static DATA_TYPE_ALIASES: Lazy<HashMap<&'static str, DataType>> = Lazy::new(|| {
    [
        ("n", DataType::Numeric),
        ("numeric", DataType::Numeric),
        ("num", DataType::Numeric),
        ("number", DataType::Numeric),
        ("a/n", DataType::Alphanumeric),
        ("alphanumeric", DataType::Alphanumeric),
        ("alpha numeric", DataType::Alphanumeric),
        ("blank", DataType::Blank),
        ("*", DataType::Any),
        ("any", DataType::Any),
        // " " trims down to the empty key
        ("", DataType::Any),
    ]
    .into_iter()
    .collect()
});

impl DataType {
    /// Resolves a data type from one of its configuration aliases.
    ///
    /// Lookup is case-insensitive and ignores surrounding whitespace.
    ///
    /// ```rust
    /// use term_flatfile::core::DataType;
    ///
    /// assert_eq!(DataType::from_alias("Num"), Some(DataType::Numeric));
    /// assert_eq!(DataType::from_alias(" A/N "), Some(DataType::Alphanumeric));
    /// assert_eq!(DataType::from_alias("decimal"), None);
    /// ```
    pub fn from_alias(text: &str) -> Option<DataType> {
        DATA_TYPE_ALIASES
            .get(text.trim().to_lowercase().as_str())
            .copied()
    }

    /// Returns true if `text` is a known alias.
    pub fn is_valid_alias(text: &str) -> bool {
        Self::from_alias(text).is_some()
    }

    /// Returns the canonical name of the data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Numeric => "Numeric",
            DataType::Alphanumeric => "Alphanumeric",
            DataType::Blank => "Blank",
            DataType::Any => "Any",
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        DataType::from_alias(&value).ok_or_else(|| format!("unknown data type '{value}'"))
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alignment of a value inside its fixed-width slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Alignment {
    Left,
    Right,
}

impl TryFrom<String> for Alignment {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "l" | "left" => Ok(Alignment::Left),
            "r" | "right" => Ok(Alignment::Right),
            _ => Err(format!("unknown alignment '{value}'")),
        }
    }
}

impl From<Alignment> for String {
    fn from(value: Alignment) -> Self {
        match value {
            Alignment::Left => "Left".to_string(),
            Alignment::Right => "Right".to_string(),
        }
    }
}

/// A single validation rule attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(rename = "type")]
    pub validation_type: ValidationType,
    #[serde(default)]
    pub severity: Severity,
    /// Kind-specific parameters, e.g. `{"regex": "^\\d+$"}`
    #[serde(default)]
    pub params: serde_json::Value,
    /// Overrides the generated message of a failed check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ValidationConfig {
    /// Creates a rule of the given kind with `params`.
    pub fn new(
        validation_type: ValidationType,
        severity: Severity,
        params: serde_json::Value,
    ) -> Self {
        Self {
            validation_type,
            severity,
            params,
            error_message: None,
        }
    }

    /// Sets a custom error message.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Reads a string parameter.
    ///
    /// A bare JSON string `params` answers for any key, so `"params": "^\\d+$"`
    /// is equivalent to `"params": {"regex": "^\\d+$"}`.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        match &self.params {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(map) => map.get(key).and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// Reads a required string parameter, failing with a configuration error.
    pub fn required_str_param(&self, key: &str) -> Result<&str> {
        self.str_param(key).ok_or_else(|| {
            TermError::configuration(format!(
                "{} validation requires a '{key}' parameter",
                self.validation_type
            ))
        })
    }
}

/// Immutable definition of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(alias = "fieldname")]
    pub field_name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    /// Declared width of the value, checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, alias = "validationConfigs")]
    pub validations: Vec<ValidationConfig>,
}

impl FieldConfig {
    pub fn new(field_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            field_name: field_name.into(),
            data_type,
            alignment: None,
            length: None,
            validations: Vec::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validations.push(validation);
        self
    }

    /// Returns true if any rule of this field has one of the given kinds.
    pub fn declares_any(&self, kinds: &[ValidationType]) -> bool {
        self.validations
            .iter()
            .any(|v| kinds.contains(&v.validation_type))
    }
}

/// Aggregate functions available to map-function directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MapFunction {
    Average,
    Aggregate,
    Min,
    Max,
    Count,
}

impl MapFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapFunction::Average => "AVERAGE",
            MapFunction::Aggregate => "AGGREGATE",
            MapFunction::Min => "MIN",
            MapFunction::Max => "MAX",
            MapFunction::Count => "COUNT",
        }
    }
}

impl fmt::Display for MapFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregation directive: feed `field_name` into the aggregate `map_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFunctionConfig {
    #[serde(alias = "fieldname")]
    pub field_name: String,
    pub function: MapFunction,
    pub map_to: String,
    /// Field whose value is prepended to the source value before parsing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_field: Option<String>,
    /// Filter condition evaluated against the staged context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl MapFunctionConfig {
    pub fn new(
        field_name: impl Into<String>,
        function: MapFunction,
        map_to: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            function,
            map_to: map_to.into(),
            sign_field: None,
            condition: None,
        }
    }

    pub fn with_sign_field(mut self, sign_field: impl Into<String>) -> Self {
        self.sign_field = Some(sign_field.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// Layout and directives of one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<Arc<FieldConfig>>,
    #[serde(default, alias = "mapFunctionConfigs")]
    pub map_functions: Vec<MapFunctionConfig>,
}

impl RecordConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(Arc::new(field));
        self
    }

    pub fn map_function(mut self, map_function: MapFunctionConfig) -> Self {
        self.map_functions.push(map_function);
        self
    }

    /// Returns the configuration of the named field.
    pub fn field_config(&self, field_name: &str) -> Option<&Arc<FieldConfig>> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }

    /// Parses a record layout from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Serialization`] for malformed JSON, an unknown
    /// data type alias or a missing required key.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_aliases() {
        assert_eq!(DataType::from_alias("N"), Some(DataType::Numeric));
        assert_eq!(DataType::from_alias("number"), Some(DataType::Numeric));
        assert_eq!(
            DataType::from_alias("Alpha Numeric"),
            Some(DataType::Alphanumeric)
        );
        assert_eq!(DataType::from_alias("BLANK"), Some(DataType::Blank));
        assert_eq!(DataType::from_alias(" "), Some(DataType::Any));
        assert_eq!(DataType::from_alias("*"), Some(DataType::Any));
        assert!(!DataType::is_valid_alias("text"));
    }

    #[test]
    fn test_record_config_from_json() {
        let config = RecordConfig::from_json(
            r#"{"name": "detail", "fields": [{"fieldName": "amount", "dataType": "N"}]}"#,
        )
        .unwrap();
        assert_eq!(config.field_config("amount").unwrap().data_type, DataType::Numeric);

        let err =
            RecordConfig::from_json(r#"{"fields": [{"fieldName": "a", "dataType": "decimal"}]}"#)
                .unwrap_err();
        assert!(matches!(err, TermError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_unknown_data_type_fails_deserialization() {
        let result: std::result::Result<FieldConfig, _> =
            serde_json::from_value(json!({"fieldName": "a", "dataType": "decimal"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_record_config_from_legacy_keys() {
        let config: RecordConfig = serde_json::from_value(json!({
            "name": "detail",
            "fields": [
                {
                    "fieldname": "amount",
                    "dataType": "Num",
                    "alignment": "R",
                    "validationConfigs": [
                        {"type": "REGEX", "severity": "WARNING", "params": {"regex": "\\d+"}}
                    ]
                },
                {"fieldname": "sign", "dataType": "*"}
            ],
            "mapFunctionConfigs": [
                {"fieldName": "amount", "function": "AGGREGATE", "mapTo": "total", "signField": "sign"}
            ]
        }))
        .unwrap();

        let amount = config.field_config("amount").unwrap();
        assert_eq!(amount.data_type, DataType::Numeric);
        assert_eq!(amount.alignment, Some(Alignment::Right));
        assert_eq!(amount.validations[0].severity, Severity::Warning);
        assert_eq!(amount.validations[0].str_param("regex"), Some("\\d+"));
        assert_eq!(config.map_functions[0].function, MapFunction::Aggregate);
        assert_eq!(config.map_functions[0].sign_field.as_deref(), Some("sign"));
    }

    #[test]
    fn test_severity_defaults_to_error() {
        let rule: ValidationConfig =
            serde_json::from_value(json!({"type": "EQUALS", "params": "X"})).unwrap();
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.str_param("value"), Some("X"));
    }

    #[test]
    fn test_required_param_missing() {
        let rule = ValidationConfig::new(ValidationType::Date, Severity::Error, json!({}));
        let err = rule.required_str_param("format").unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));
    }

    #[test]
    fn test_declares_any() {
        let field = FieldConfig::new("zip", DataType::Numeric).with_validation(
            ValidationConfig::new(ValidationType::In, Severity::Error, json!(["1"])),
        );
        assert!(field.declares_any(&[ValidationType::In, ValidationType::Date]));
        assert!(!field.declares_any(&[ValidationType::Regex]));
    }
}
