//! ParamVector — one strategy configuration as a named value mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single parameter value: integer (lookbacks, bar counts) or float
/// (fractions like spread and stop percentages).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Errors from typed parameter access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameter '{0}' not found")]
    Missing(String),
    #[error("parameter '{0}' has the wrong type")]
    WrongType(String),
}

/// Immutable mapping from parameter name to value.
///
/// A `ParamVector` defines one strategy configuration; the optimizer's
/// history records one per evaluation. BTreeMap keeps iteration (and CSV
/// column) order stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamVector(BTreeMap<String, ParamValue>);

impl ParamVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ParamError> {
        match self.get(name) {
            Some(ParamValue::Int(v)) => Ok(v),
            Some(_) => Err(ParamError::WrongType(name.to_string())),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    /// Float access; integer values widen losslessly.
    pub fn get_float(&self, name: &str) -> Result<f64, ParamError> {
        match self.get(name) {
            Some(ParamValue::Float(v)) => Ok(v),
            Some(ParamValue::Int(v)) => Ok(v as f64),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> ParamVector {
        ParamVector::new()
            .with("lookback", ParamValue::Int(20))
            .with("spread", ParamValue::Float(0.001))
            .with("trailing_stop_pct", ParamValue::Float(0.03))
    }

    #[test]
    fn typed_getters() {
        let p = sample_params();
        assert_eq!(p.get_int("lookback").unwrap(), 20);
        assert!((p.get_float("spread").unwrap() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn int_widens_to_float() {
        let p = sample_params();
        assert_eq!(p.get_float("lookback").unwrap(), 20.0);
    }

    #[test]
    fn missing_and_wrong_type_errors() {
        let p = sample_params();
        assert_eq!(
            p.get_int("nope"),
            Err(ParamError::Missing("nope".to_string()))
        );
        assert_eq!(
            p.get_int("spread"),
            Err(ParamError::WrongType("spread".to_string()))
        );
    }

    #[test]
    fn iteration_order_is_stable() {
        let p = sample_params();
        let names: Vec<_> = p.names().collect();
        assert_eq!(names, vec!["lookback", "spread", "trailing_stop_pct"]);
    }
}
