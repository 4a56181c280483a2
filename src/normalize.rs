//! Normalization of upstream results into plain JSON mappings.
//!
//! The writer stage embeds each upstream result as JSON text and the report
//! appendix reproduces them verbatim. Inputs may be typed records, plain
//! mappings, or loosely shaped values, so conversion is an ordered chain of
//! independent strategies with a guaranteed fallback. Normalization never
//! fails a run.

use serde::Serialize;
use serde_json::{Map, Value};

/// One conversion attempt. Returns `None` to pass to the next strategy.
type Strategy = fn(&Value) -> Option<Value>;

/// Strategies in the order they are tried on the serialized input.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("canonical", canonical),
    ("legacy", legacy),
    ("attributes", attributes),
];

/// Convert `input` into a plain JSON mapping, or return its serialized form
/// unchanged if no strategy applies.
pub fn to_mapping<T: Serialize + ?Sized>(input: &T) -> Value {
    let value = match serde_json::to_value(input) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Input is not serializable, normalizing to null");
            return Value::Null;
        }
    };

    for (name, strategy) in STRATEGIES {
        if let Some(mapping) = strategy(&value) {
            tracing::trace!(strategy = name, "Normalized input");
            return mapping;
        }
    }
    value
}

/// Records and maps already serialize to an object.
fn canonical(value: &Value) -> Option<Value> {
    value.is_object().then(|| value.clone())
}

/// A string holding a JSON object, as produced by older callers that passed
/// raw model output around.
fn legacy(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(parsed @ Value::Object(_)) => Some(parsed),
        _ => None,
    }
}

/// A list of `[key, value]` pairs or of `{"key"|"name": .., "value": ..}`
/// entries.
fn attributes(value: &Value) -> Option<Value> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }

    let mut map = Map::new();
    for item in items {
        let (key, field) = match item {
            Value::Array(pair) if pair.len() == 2 => (pair[0].as_str()?, pair[1].clone()),
            Value::Object(entry) => {
                let key = entry
                    .get("key")
                    .or_else(|| entry.get("name"))
                    .and_then(Value::as_str)?;
                (key, entry.get("value")?.clone())
            }
            _ => return None,
        };
        map.insert(key.to_string(), field);
    }
    Some(Value::Object(map))
}

/// The three upstream results, normalized for the writer stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInputs {
    pub competitor_analysis: Value,
    pub market_analysis: Value,
    pub financial_analysis: Value,
}

impl NormalizedInputs {
    /// Pretty JSON text for each section, in competitor, market, financial
    /// order.
    pub fn sections(&self) -> [String; 3] {
        [
            pretty(&self.competitor_analysis),
            pretty(&self.market_analysis),
            pretty(&self.financial_analysis),
        ]
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Normalize all three upstream results.
pub fn normalize_inputs<C, M, F>(competitor: &C, market: &M, financial: &F) -> NormalizedInputs
where
    C: Serialize + ?Sized,
    M: Serialize + ?Sized,
    F: Serialize + ?Sized,
{
    NormalizedInputs {
        competitor_analysis: to_mapping(competitor),
        market_analysis: to_mapping(market),
        financial_analysis: to_mapping(financial),
    }
}
