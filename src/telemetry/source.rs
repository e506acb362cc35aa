use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single named telemetry value as published by the simulator.
///
/// Integer fields (indices, surface flags) are carried as `Number`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Array(Vec<f64>),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        FieldValue::Array(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Read contract of an external telemetry provider.
///
/// Every field is optional; implementations must never fail a read, only
/// report absence.
pub trait FieldSource: Send {
    /// Short human-readable name for logs and the status page.
    fn describe(&self) -> String;

    fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Latch the next tick of data. Called once per tick before any read.
    fn advance(&mut self);

    fn field(&self, name: &str) -> Option<&FieldValue>;

    fn field_names(&self) -> Vec<String>;

    fn shutdown(&mut self);
}
