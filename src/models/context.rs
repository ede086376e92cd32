use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Attribute key used as the bucketing subject, checked before `id`
pub const SUBJECT_KEY: &str = "userId";
pub const SUBJECT_FALLBACK_KEY: &str = "id";
/// Shared bucket for contexts without a subject identifier
pub const ANONYMOUS_SUBJECT: &str = "anon";

/// A single context attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Bool(b) => write!(f, "{}", b),
            ContextValue::Number(n) => f.write_str(&format_number(*n)),
            ContextValue::String(s) => f.write_str(s),
        }
    }
}

/// Renders a number the way JSON clients stringify it: plain decimal inside
/// [1e-6, 1e21), exponent form with an explicit sign outside it.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if !magnitude.is_finite() || (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }

    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

/// Request-time attribute bag. JSON `null` attributes are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, Option<ContextValue>>")]
pub struct EvaluationContext {
    attributes: HashMap<String, ContextValue>,
}

impl Serialize for EvaluationContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl From<HashMap<String, Option<ContextValue>>> for EvaluationContext {
    fn from(raw: HashMap<String, Option<ContextValue>>) -> Self {
        let attributes = raw
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        Self { attributes }
    }
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.attributes.get(key)
    }

    /// Stable identifier used for rollout and variant bucketing
    pub fn subject_id(&self) -> String {
        self.get(SUBJECT_KEY)
            .or_else(|| self.get(SUBJECT_FALLBACK_KEY))
            .map(|v| v.to_string())
            .unwrap_or_else(|| ANONYMOUS_SUBJECT.to_string())
    }
}
