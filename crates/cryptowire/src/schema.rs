//! Declarative tool input schemas.
//!
//! A tool's input is a flat set of named fields, each of one [`FieldKind`].
//! [`InputSchema::validate`] turns raw JSON arguments into an [`Arguments`]
//! record with defaults substituted, and [`InputSchema::to_json_schema`]
//! renders the JSON Schema advertised to clients.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// The kinds of value a field may hold.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free-form string.
    Text,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
    /// Number with optional inclusive bounds.
    Number { min: Option<f64>, max: Option<f64> },
    /// Whole number with optional inclusive bounds. `5.0` is accepted,
    /// `1.5` is not.
    Integer { min: Option<f64>, max: Option<f64> },
    /// Array of strings.
    TextList,
    /// Boolean carried as the enum `"true"` / `"false"`. JSON booleans are
    /// accepted too.
    Flag,
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Choice(_) => "a string",
            FieldKind::Number { .. } => "a number",
            FieldKind::Integer { .. } => "an integer",
            FieldKind::TextList => "an array of strings",
            FieldKind::Flag => "\"true\" or \"false\"",
        }
    }
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Number(f64),
    TextList(Vec<String>),
    Flag(bool),
}

/// One field of an input schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<ArgValue>,
}

impl FieldSpec {
    fn new(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn text(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::Text)
    }

    pub fn choice(
        name: &'static str,
        description: &'static str,
        allowed: &'static [&'static str],
    ) -> Self {
        Self::new(name, description, FieldKind::Choice(allowed))
    }

    pub fn number(
        name: &'static str,
        description: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(name, description, FieldKind::Number { min, max })
    }

    pub fn integer(
        name: &'static str,
        description: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(name, description, FieldKind::Integer { min, max })
    }

    pub fn text_list(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::TextList)
    }

    pub fn flag(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::Flag)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    fn to_json(&self) -> Value {
        let mut prop = match &self.kind {
            FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Choice(allowed) => json!({ "type": "string", "enum": allowed }),
            FieldKind::Number { min, max } | FieldKind::Integer { min, max } => {
                let ty = match self.kind {
                    FieldKind::Integer { .. } => "integer",
                    _ => "number",
                };
                let mut p = json!({ "type": ty });
                if let Some(min) = min {
                    p["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    p["maximum"] = json!(max);
                }
                p
            }
            FieldKind::TextList => json!({ "type": "array", "items": { "type": "string" } }),
            FieldKind::Flag => json!({ "type": "string", "enum": ["true", "false"] }),
        };

        if !self.description.is_empty() {
            prop["description"] = json!(self.description);
        }
        if let Some(default) = &self.default {
            prop["default"] = match default {
                ArgValue::Text(s) => json!(s),
                ArgValue::Number(n) => json!(n),
                ArgValue::TextList(items) => json!(items),
                ArgValue::Flag(b) => json!(if *b { "true" } else { "false" }),
            };
        }
        prop
    }

    fn coerce(&self, raw: &Value) -> Result<ArgValue, SchemaError> {
        let wrong_type = || SchemaError::WrongType {
            field: self.name.to_string(),
            expected: self.kind.expected(),
        };

        match &self.kind {
            FieldKind::Text => raw
                .as_str()
                .map(|s| ArgValue::Text(s.to_string()))
                .ok_or_else(wrong_type),
            FieldKind::Choice(allowed) => {
                let s = raw.as_str().ok_or_else(wrong_type)?;
                if allowed.contains(&s) {
                    Ok(ArgValue::Text(s.to_string()))
                } else {
                    Err(SchemaError::NotAllowed {
                        field: self.name.to_string(),
                        allowed: allowed.join(", "),
                    })
                }
            }
            FieldKind::Number { min, max } | FieldKind::Integer { min, max } => {
                let n = raw.as_f64().ok_or_else(wrong_type)?;
                if matches!(self.kind, FieldKind::Integer { .. }) && n.fract() != 0.0 {
                    return Err(wrong_type());
                }
                let below = min.is_some_and(|m| n < m);
                let above = max.is_some_and(|m| n > m);
                if below || above {
                    return Err(SchemaError::OutOfRange {
                        field: self.name.to_string(),
                        value: n,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(ArgValue::Number(n))
            }
            FieldKind::TextList => {
                let items = raw.as_array().ok_or_else(wrong_type)?;
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ArgValue::TextList)
            }
            FieldKind::Flag => match raw {
                Value::Bool(b) => Ok(ArgValue::Flag(*b)),
                Value::String(s) if s == "true" => Ok(ArgValue::Flag(true)),
                Value::String(s) if s == "false" => Ok(ArgValue::Flag(false)),
                _ => Err(wrong_type()),
            },
        }
    }
}

/// Input schema for one tool.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A schema with no fields.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.to_json());
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Validate raw arguments.
    ///
    /// `null` and a missing field are the same thing. Fields the schema does
    /// not declare are dropped.
    pub fn validate(&self, raw: &Value) -> Result<Arguments, SchemaError> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(SchemaError::NotAnObject),
        };

        let mut values = BTreeMap::new();
        for field in &self.fields {
            match object.get(field.name).filter(|v| !v.is_null()) {
                Some(raw_value) => {
                    values.insert(field.name.to_string(), field.coerce(raw_value)?);
                }
                None if field.required => {
                    return Err(SchemaError::Missing(field.name.to_string()));
                }
                None => {
                    if let Some(default) = &field.default {
                        values.insert(field.name.to_string(), default.clone());
                    }
                }
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|f| f.name == key) {
                tracing::debug!("Dropping undeclared argument '{key}'");
            }
        }

        Ok(Arguments { values })
    }
}

/// A validated argument record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, ArgValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text_list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ArgValue::TextList(items)) => Some(items),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Argument validation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Arguments must be a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    Missing(String),

    #[error("Field '{field}' must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("Field '{field}' must be one of: {allowed}")]
    NotAllowed { field: String, allowed: String },

    #[error("Field '{field}' is {value}, outside {}", range_text(.min, .max))]
    OutOfRange {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

fn range_text(min: &Option<f64>, max: &Option<f64>) -> String {
    match (*min, *max) {
        (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
        (Some(lo), None) => format!("[{lo}, ∞)"),
        (None, Some(hi)) => format!("(-∞, {hi}]"),
        (None, None) => "any range".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENCIES: &[&str] = &["USD", "EUR"];

    fn sample() -> InputSchema {
        InputSchema::new(vec![
            FieldSpec::text("coin_id", "Coin identifier").required(),
            FieldSpec::choice("currency", "Quote currency", CURRENCIES)
                .with_default(ArgValue::Text("USD".to_string())),
            FieldSpec::integer("limit", "Max rows", Some(1.0), Some(100.0))
                .with_default(ArgValue::Number(20.0)),
            FieldSpec::text_list("symbols", ""),
            FieldSpec::flag("verbose", "").with_default(ArgValue::Flag(false)),
        ])
    }

    #[test]
    fn test_defaults_are_substituted() {
        let args = sample().validate(&json!({ "coin_id": "bitcoin" })).unwrap();
        assert_eq!(args.text("coin_id"), Some("bitcoin"));
        assert_eq!(args.text("currency"), Some("USD"));
        assert_eq!(args.number("limit"), Some(20.0));
        assert_eq!(args.flag("verbose"), Some(false));
        assert!(args.text_list("symbols").is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = sample().validate(&json!({})).unwrap_err();
        assert_eq!(err, SchemaError::Missing("coin_id".to_string()));

        let err = sample().validate(&json!({ "coin_id": null })).unwrap_err();
        assert_eq!(err, SchemaError::Missing("coin_id".to_string()));
    }

    #[test]
    fn test_choice_rejects_unknown_value() {
        let err = sample()
            .validate(&json!({ "coin_id": "btc", "currency": "JPY" }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotAllowed { .. }));
        assert!(err.to_string().contains("USD, EUR"));
    }

    #[test]
    fn test_number_bounds_are_inclusive() {
        let schema = sample();
        assert!(schema.validate(&json!({ "coin_id": "x", "limit": 1 })).is_ok());
        assert!(schema.validate(&json!({ "coin_id": "x", "limit": 100 })).is_ok());

        let err = schema
            .validate(&json!({ "coin_id": "x", "limit": 101 }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::OutOfRange { value, .. } if value == 101.0));
        assert!(schema.validate(&json!({ "coin_id": "x", "limit": 0 })).is_err());
        assert!(schema.validate(&json!({ "coin_id": "x", "limit": "10" })).is_err());
    }

    #[test]
    fn test_integer_rejects_fractions() {
        let schema = sample();
        let args = schema.validate(&json!({ "coin_id": "x", "limit": 5.0 })).unwrap();
        assert_eq!(args.number("limit"), Some(5.0));

        let err = schema
            .validate(&json!({ "coin_id": "x", "limit": 1.5 }))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::WrongType {
                field: "limit".to_string(),
                expected: "an integer",
            }
        );

        let score = InputSchema::new(vec![FieldSpec::number("score", "", None, None)]);
        assert!(score.validate(&json!({ "score": 1.5 })).is_ok());
    }

    #[test]
    fn test_flag_accepts_strings_and_bools() {
        let schema = sample();
        let a = schema.validate(&json!({ "coin_id": "x", "verbose": "true" })).unwrap();
        assert_eq!(a.flag("verbose"), Some(true));
        let b = schema.validate(&json!({ "coin_id": "x", "verbose": false })).unwrap();
        assert_eq!(b.flag("verbose"), Some(false));
        assert!(schema.validate(&json!({ "coin_id": "x", "verbose": "yes" })).is_err());
    }

    #[test]
    fn test_text_list_requires_strings() {
        let schema = sample();
        let args = schema
            .validate(&json!({ "coin_id": "x", "symbols": ["BTC", "ETH"] }))
            .unwrap();
        assert_eq!(
            args.text_list("symbols"),
            Some(&["BTC".to_string(), "ETH".to_string()][..])
        );
        assert!(schema.validate(&json!({ "coin_id": "x", "symbols": ["BTC", 1] })).is_err());
        assert!(schema.validate(&json!({ "coin_id": "x", "symbols": "BTC" })).is_err());
    }

    #[test]
    fn test_non_object_and_null_arguments() {
        assert_eq!(
            sample().validate(&json!([1, 2])).unwrap_err(),
            SchemaError::NotAnObject
        );
        let empty = InputSchema::empty().validate(&Value::Null).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_undeclared_fields_are_dropped() {
        let args = sample()
            .validate(&json!({ "coin_id": "x", "extra": 42 }))
            .unwrap();
        assert!(args.get("extra").is_none());
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = sample().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["coin_id"]));
        assert_eq!(schema["properties"]["currency"]["enum"], json!(["USD", "EUR"]));
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["minimum"], json!(1.0));
        assert_eq!(schema["properties"]["limit"]["maximum"], json!(100.0));
        assert_eq!(schema["properties"]["symbols"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["verbose"]["default"], "false");
        assert!(schema["properties"]["symbols"].get("description").is_none());

        let empty = InputSchema::empty().to_json_schema();
        assert!(empty.get("required").is_none());
    }
}
