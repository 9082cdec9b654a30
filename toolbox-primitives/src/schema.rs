//! Declarative parameter schemas and best-effort validation.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{Error, Result};

/// Named parameters passed to a tool invocation.
pub type Parameters = serde_json::Map<String, Value>;

/// JSON type expected for a parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A JSON string.
    String,
    /// A JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
    /// Any value, including `null`.
    Any,
}

impl FieldType {
    /// Returns `true` when `value` satisfies this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a single parameter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    kind: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl FieldSpec {
    /// Declares a parameter that must be present.
    #[must_use]
    pub const fn required(kind: FieldType) -> Self {
        Self {
            kind,
            required: true,
            description: None,
        }
    }

    /// Declares a parameter that may be omitted.
    #[must_use]
    pub const fn optional(kind: FieldType) -> Self {
        Self {
            kind,
            required: false,
            description: None,
        }
    }

    /// Attaches a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the expected type.
    #[must_use]
    pub const fn kind(&self) -> FieldType {
        self.kind
    }

    /// Returns `true` when the parameter is mandatory.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Parameter rejected by [`ParameterSchema::validate`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SchemaViolation {
    /// A required parameter was absent or `null`.
    #[error("missing required parameter `{field}`")]
    MissingField {
        /// Name of the missing parameter.
        field: String,
    },

    /// A parameter was supplied that the schema does not declare.
    #[error("unexpected parameter `{field}`")]
    UnknownField {
        /// Name of the undeclared parameter.
        field: String,
    },

    /// A parameter had the wrong JSON type.
    #[error("parameter `{field}` must be {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending parameter.
        field: String,
        /// Declared type.
        expected: FieldType,
        /// Type of the supplied value.
        actual: &'static str,
    },
}

/// Field name to [`FieldSpec`] mapping declared by a tool.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    allow_additional: bool,
}

impl ParameterSchema {
    /// Starts building a schema.
    #[must_use]
    pub fn builder() -> ParameterSchemaBuilder {
        ParameterSchemaBuilder {
            fields: BTreeMap::new(),
            allow_additional: false,
        }
    }

    /// Schema that accepts no parameters.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the declared fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, FieldSpec> {
        &self.fields
    }

    /// Returns the declaration for `name`, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Returns `true` when undeclared parameters are tolerated.
    #[must_use]
    pub const fn allows_additional(&self) -> bool {
        self.allow_additional
    }

    /// Checks `params` against the declared fields.
    ///
    /// `null` supplied for an optional field is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaViolation`] found, checking declared fields
    /// in name order before looking for undeclared ones.
    pub fn validate(&self, params: &Parameters) -> std::result::Result<(), SchemaViolation> {
        for (name, spec) in &self.fields {
            match params.get(name) {
                None | Some(Value::Null) if spec.required && spec.kind != FieldType::Any => {
                    return Err(SchemaViolation::MissingField { field: name.clone() });
                }
                None if spec.required => {
                    return Err(SchemaViolation::MissingField { field: name.clone() });
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(SchemaViolation::TypeMismatch {
                        field: name.clone(),
                        expected: spec.kind,
                        actual: value_label(value),
                    });
                }
                Some(_) => {}
            }
        }

        if !self.allow_additional {
            if let Some(name) = params.keys().find(|key| !self.fields.contains_key(*key)) {
                return Err(SchemaViolation::UnknownField {
                    field: name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`ParameterSchema`].
#[derive(Debug)]
pub struct ParameterSchemaBuilder {
    fields: BTreeMap<String, FieldSpec>,
    allow_additional: bool,
}

impl ParameterSchemaBuilder {
    /// Declares a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] when the name is blank or already declared.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidSchema {
                reason: "field name cannot be empty".into(),
            });
        }
        match self.fields.entry(name) {
            Entry::Occupied(entry) => Err(Error::InvalidSchema {
                reason: format!("field `{}` declared twice", entry.key()),
            }),
            Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(self)
            }
        }
    }

    /// Declares a mandatory field of the given type.
    ///
    /// # Errors
    ///
    /// See [`ParameterSchemaBuilder::field`].
    pub fn required(self, name: impl Into<String>, kind: FieldType) -> Result<Self> {
        self.field(name, FieldSpec::required(kind))
    }

    /// Declares an optional field of the given type.
    ///
    /// # Errors
    ///
    /// See [`ParameterSchemaBuilder::field`].
    pub fn optional(self, name: impl Into<String>, kind: FieldType) -> Result<Self> {
        self.field(name, FieldSpec::optional(kind))
    }

    /// Tolerates parameters the schema does not declare.
    #[must_use]
    pub fn allow_additional(mut self) -> Self {
        self.allow_additional = true;
        self
    }

    /// Finalises the schema.
    #[must_use]
    pub fn build(self) -> ParameterSchema {
        ParameterSchema {
            fields: self.fields,
            allow_additional: self.allow_additional,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn price_schema() -> ParameterSchema {
        ParameterSchema::builder()
            .required("symbol", FieldType::String)
            .and_then(|b| b.optional("limit", FieldType::Integer))
            .and_then(|b| b.optional("include_volume", FieldType::Boolean))
            .expect("schema")
            .build()
    }

    #[test]
    fn accepts_valid_parameters() {
        let schema = price_schema();
        schema
            .validate(&params(json!({"symbol": "ETH-USDC", "limit": 10})))
            .unwrap();
        schema
            .validate(&params(json!({"symbol": "BTC-USDT", "limit": null})))
            .unwrap();
    }

    #[test]
    fn reports_missing_required_field() {
        let err = price_schema()
            .validate(&params(json!({"limit": 5})))
            .expect_err("missing");
        assert_eq!(
            err,
            SchemaViolation::MissingField {
                field: "symbol".into()
            }
        );

        let err = price_schema()
            .validate(&params(json!({"symbol": null})))
            .expect_err("null required");
        assert!(matches!(err, SchemaViolation::MissingField { .. }));
    }

    #[test]
    fn reports_type_mismatch() {
        let err = price_schema()
            .validate(&params(json!({"symbol": "ETH", "limit": 2.5})))
            .expect_err("mismatch");
        assert_eq!(
            err,
            SchemaViolation::TypeMismatch {
                field: "limit".into(),
                expected: FieldType::Integer,
                actual: "number",
            }
        );
        assert_eq!(err.to_string(), "parameter `limit` must be integer, got number");
    }

    #[test]
    fn unknown_fields_depend_on_policy() {
        let strict = price_schema();
        let err = strict
            .validate(&params(json!({"symbol": "ETH", "exchange": "binance"})))
            .expect_err("unknown");
        assert!(matches!(err, SchemaViolation::UnknownField { field } if field == "exchange"));

        let lenient = ParameterSchema::builder()
            .required("symbol", FieldType::String)
            .unwrap()
            .allow_additional()
            .build();
        lenient
            .validate(&params(json!({"symbol": "ETH", "exchange": "binance"})))
            .unwrap();
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let err = ParameterSchema::builder()
            .required("address", FieldType::String)
            .and_then(|b| b.optional("address", FieldType::String))
            .expect_err("duplicate");
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn schema_serializes_declaratively() {
        let schema = ParameterSchema::builder()
            .field(
                "address",
                FieldSpec::required(FieldType::String).with_description("wallet address"),
            )
            .unwrap()
            .build();
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "fields": {
                    "address": {"type": "string", "required": true, "description": "wallet address"}
                },
                "allow_additional": false
            })
        );
    }
}
