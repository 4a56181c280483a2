//! Generated schema contracts.
//!
//! A [`Contract`] pairs a record type with its `schemars`-generated JSON
//! Schema and a compiled `jsonschema` validator. Raw service output has
//! numeric strings lifted to numbers where the schema asks for one, is
//! validated against the schema, then deserialized, then settled by the
//! record's own post-checks.

use std::marker::PhantomData;

use schemars::{JsonSchema, schema_for};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{
    BusinessReport, CompetitorAnalysisResult, FinancialEstimationResult, MAX_COMPETITORS,
    MarketResearchOutput, is_iso8601, now_rfc3339,
};
use crate::error::{Error, Result};
use crate::stage::StageKind;

/// A record a stage can produce.
pub trait StageOutput: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Checks and coercions that run after deserialization.
    ///
    /// Returns the (possibly adjusted) record, or a message describing why
    /// it cannot be accepted.
    fn settle(self) -> std::result::Result<Self, String> {
        Ok(self)
    }
}

impl StageOutput for CompetitorAnalysisResult {
    fn settle(self) -> std::result::Result<Self, String> {
        if self.industry.trim().is_empty() {
            return Err("industry must not be empty".to_string());
        }
        if self.competitors.len() > MAX_COMPETITORS {
            return Err(format!(
                "{} competitors listed, at most {} allowed",
                self.competitors.len(),
                MAX_COMPETITORS
            ));
        }
        Ok(self)
    }
}

impl StageOutput for MarketResearchOutput {}

impl StageOutput for FinancialEstimationResult {
    fn settle(self) -> std::result::Result<Self, String> {
        for (label, value) in [("TAM", self.tam), ("SAM", self.sam), ("SOM", self.som)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", label, value));
            }
        }
        if !self.is_nested() {
            tracing::warn!(
                tam = self.tam,
                sam = self.sam,
                som = self.som,
                "Market sizes are not nested (expected SOM <= SAM <= TAM)"
            );
        }
        Ok(self)
    }
}

impl StageOutput for BusinessReport {
    fn settle(mut self) -> std::result::Result<Self, String> {
        if self.report_markdown.trim().is_empty() {
            return Err("report_markdown must not be empty".to_string());
        }
        if !is_iso8601(&self.generated_at) {
            let stamped = now_rfc3339();
            tracing::warn!(
                received = %self.generated_at,
                replaced_with = %stamped,
                "generated_at is not an ISO-8601 timestamp"
            );
            self.generated_at = stamped;
        }
        Ok(self)
    }
}

/// A record type's generated schema plus its compiled validator.
pub struct Contract<T> {
    name: String,
    schema: Value,
    validator: jsonschema::Validator,
    _marker: PhantomData<fn() -> T>,
}

impl<T: StageOutput> Contract<T> {
    /// Generate and compile the schema for `T`.
    pub fn new() -> Result<Self> {
        let schema = serde_json::to_value(schema_for!(T))
            .map_err(|e| Error::Schema(format!("{}: {}", T::schema_name(), e)))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| Error::Schema(format!("{}: {}", T::schema_name(), e)))?;

        Ok(Self {
            name: T::schema_name().into_owned(),
            schema,
            validator,
            _marker: PhantomData,
        })
    }

    /// Schema name, used as the structured-output format name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generated JSON Schema.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `value` against the schema and turn it into a `T`.
    ///
    /// Numeric strings (`"72"`, `"4.5e10"`) are accepted wherever the schema
    /// declares an `integer` or `number`.
    pub fn coerce(&self, stage: StageKind, mut value: Value) -> Result<T> {
        lift_numbers(&self.schema, &self.schema, &mut value);

        let errors: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        if !errors.is_empty() {
            return Err(Error::SchemaMismatch { stage, errors });
        }

        let record: T =
            serde_json::from_value(value).map_err(|e| Error::mismatch(stage, e.to_string()))?;
        record.settle().map_err(|e| Error::mismatch(stage, e))
    }
}

/// Replace numeric strings with numbers wherever `schema` expects one,
/// following `properties`, `items` and local `$ref`s.
fn lift_numbers(root: &Value, schema: &Value, value: &mut Value) {
    let schema = resolve_ref(root, schema);

    let lifted = match value {
        Value::String(text) => parse_numeric(text, schema),
        _ => None,
    };
    if let Some(number) = lifted {
        *value = number;
        return;
    }

    match value {
        Value::Object(fields) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (key, field_schema) in properties {
                if let Some(field) = fields.get_mut(key) {
                    lift_numbers(root, field_schema, field);
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    lift_numbers(root, item_schema, item);
                }
            }
        }
        _ => {}
    }
}

fn resolve_ref<'a>(root: &'a Value, schema: &'a Value) -> &'a Value {
    schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| root.pointer(pointer))
        .unwrap_or(schema)
}

fn declares_type(schema: &Value, name: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t == name),
        _ => false,
    }
}

fn parse_numeric(text: &str, schema: &Value) -> Option<Value> {
    let text = text.trim();
    if declares_type(schema, "integer") {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::from(n));
        }
        if let Ok(f) = text.parse::<f64>()
            && f.is_finite()
            && f.fract() == 0.0
            && f.abs() < i64::MAX as f64
        {
            return Some(Value::from(f as i64));
        }
    }
    if declares_type(schema, "number") {
        let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
        return serde_json::Number::from_f64(f).map(Value::Number);
    }
    None
}
