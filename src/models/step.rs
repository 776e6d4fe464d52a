//! Step models for fixture sequences
//!
//! Defines step kinds, limits, readings and the outcome of a single step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Reasons a step could not produce a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepFault {
    #[error("Measurement source failed: {0}")]
    Source(String),

    #[error("Expected a {expected} reading, got {got}")]
    KindMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("No measurement available for step '{0}'")]
    UnknownStep(String),

    #[error("Step panicked: {0}")]
    Panicked(String),
}

/// Inclusive measurement limits; either bound may be open
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

impl Limits {
    pub fn range(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    pub fn at_least(low: f64) -> Self {
        Self {
            low: Some(low),
            high: None,
        }
    }

    pub fn at_most(high: f64) -> Self {
        Self {
            low: None,
            high: Some(high),
        }
    }

    /// Check a value against both bounds (inclusive)
    pub fn contains(&self, value: f64) -> bool {
        self.low.map_or(true, |low| value >= low) && self.high.map_or(true, |high| value <= high)
    }

    /// At least one bound is set
    pub fn is_bounded(&self) -> bool {
        self.low.is_some() || self.high.is_some()
    }

    /// Bounds are not inverted
    pub fn is_ordered(&self) -> bool {
        match (self.low, self.high) {
            (Some(low), Some(high)) => low <= high,
            _ => true,
        }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (Some(low), Some(high)) => write!(f, "[{low}, {high}]"),
            (Some(low), None) => write!(f, "[{low}, ..]"),
            (None, Some(high)) => write!(f, "[.., {high}]"),
            (None, None) => write!(f, "[.., ..]"),
        }
    }
}

/// Kind of a step, carrying its validation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Boolean,
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        limits: Limits,
    },
    String {
        expected: String,
    },
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Boolean => "boolean",
            StepKind::Numeric { .. } => "numeric",
            StepKind::String { .. } => "string",
        }
    }

    /// Turn a raw reading into an outcome according to this kind's rules
    pub fn evaluate(&self, reading: Reading) -> Result<StepOutcome, StepFault> {
        match (self, reading) {
            (StepKind::Boolean, Reading::Flag(passed)) => Ok(StepOutcome::flag(passed)),
            (StepKind::Numeric { unit, limits }, Reading::Number(value)) => Ok(StepOutcome {
                passed: limits.contains(value),
                measured_value: Some(MeasuredValue::Number(value)),
                unit: unit.clone(),
                limit_low: limits.low,
                limit_high: limits.high,
                fault: None,
                attachment: None,
            }),
            (StepKind::String { expected }, Reading::Text(value)) => Ok(StepOutcome {
                passed: &value == expected,
                measured_value: Some(MeasuredValue::Text(value)),
                unit: None,
                limit_low: None,
                limit_high: None,
                fault: None,
                attachment: None,
            }),
            (kind, reading) => Err(StepFault::KindMismatch {
                expected: kind.label(),
                got: reading.label(),
            }),
        }
    }
}

/// Raw value produced by a measurement source
#[derive(Clone, Debug, PartialEq)]
pub enum Reading {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl Reading {
    pub fn label(&self) -> &'static str {
        match self {
            Reading::Flag(_) => "boolean",
            Reading::Number(_) => "numeric",
            Reading::Text(_) => "string",
        }
    }
}

/// Value recorded in a step outcome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasuredValue {
    Number(f64),
    Text(String),
}

impl MeasuredValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasuredValue::Number(v) => Some(*v),
            MeasuredValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MeasuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasuredValue::Number(v) => write!(f, "{v}"),
            MeasuredValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Definition of one step in a sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Descriptive only; never enforced as a deadline
    pub expected_duration: Duration,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, kind: StepKind, expected_secs: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            expected_duration: Duration::from_secs(expected_secs),
        }
    }

    pub fn boolean(name: impl Into<String>, expected_secs: u64) -> Self {
        Self::new(name, StepKind::Boolean, expected_secs)
    }

    pub fn numeric(
        name: impl Into<String>,
        unit: impl Into<String>,
        limits: Limits,
        expected_secs: u64,
    ) -> Self {
        Self::new(
            name,
            StepKind::Numeric {
                unit: Some(unit.into()),
                limits,
            },
            expected_secs,
        )
    }

    pub fn string(name: impl Into<String>, expected: impl Into<String>, expected_secs: u64) -> Self {
        Self::new(
            name,
            StepKind::String {
                expected: expected.into(),
            },
            expected_secs,
        )
    }
}

impl fmt::Display for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Boolean => write!(f, "{} (boolean)", self.name),
            StepKind::Numeric { unit, limits } => write!(
                f,
                "{} (numeric {} {})",
                self.name,
                limits,
                unit.as_deref().unwrap_or("")
            ),
            StepKind::String { expected } => write!(f, "{} (string == {expected:?})", self.name),
        }
    }
}

/// Result of executing a single step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub passed: bool,
    pub measured_value: Option<MeasuredValue>,
    pub unit: Option<String>,
    pub limit_low: Option<f64>,
    pub limit_high: Option<f64>,
    /// Why the step could not produce a result, if it faulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<PathBuf>,
}

impl StepOutcome {
    pub fn flag(passed: bool) -> Self {
        Self {
            passed,
            measured_value: None,
            unit: None,
            limit_low: None,
            limit_high: None,
            fault: None,
            attachment: None,
        }
    }

    /// Failing outcome for a step that faulted; numeric steps keep their unit and limits
    pub fn faulted(kind: &StepKind, fault: &StepFault) -> Self {
        let (unit, limit_low, limit_high) = match kind {
            StepKind::Numeric { unit, limits } => (unit.clone(), limits.low, limits.high),
            _ => (None, None, None),
        };

        Self {
            passed: false,
            measured_value: None,
            unit,
            limit_low,
            limit_high,
            fault: Some(fault.to_string()),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: Option<PathBuf>) -> Self {
        self.attachment = path;
        self
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}
