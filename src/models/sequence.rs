//! Sequence models
//!
//! An ordered, immutable list of steps plus the abort policy used when running it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::step::{StepDefinition, StepKind};

/// Errors raised while building a sequence
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("Sequence '{0}' has no steps")]
    Empty(String),

    #[error("Duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("Numeric step '{0}' needs at least one limit")]
    Unbounded(String),

    #[error("Numeric step '{0}' has low limit above high limit")]
    InvertedLimits(String),
}

/// What to do after a failing step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortPolicy {
    /// Execute every step regardless of earlier failures
    #[default]
    RunAll,
    /// Stop right after the first failing step
    AbortOnFirstFailure,
}

impl AbortPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "run-all" | "all" | "continue" => Some(AbortPolicy::RunAll),
            "abort-on-first-failure" | "abort" | "stop" | "fail-fast" => {
                Some(AbortPolicy::AbortOnFirstFailure)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AbortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortPolicy::RunAll => write!(f, "run-all"),
            AbortPolicy::AbortOnFirstFailure => write!(f, "abort-on-first-failure"),
        }
    }
}

/// Validated, ordered list of step definitions
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sequence {
    name: String,
    steps: Vec<StepDefinition>,
    policy: AbortPolicy,
}

impl Sequence {
    /// Build a sequence, rejecting empty lists, duplicate names and malformed limits
    pub fn new(
        name: impl Into<String>,
        steps: Vec<StepDefinition>,
        policy: AbortPolicy,
    ) -> Result<Self, SequenceError> {
        let name = name.into();
        if steps.is_empty() {
            return Err(SequenceError::Empty(name));
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name.as_str()) {
                return Err(SequenceError::DuplicateStep(step.name.clone()));
            }
            if let StepKind::Numeric { limits, .. } = &step.kind {
                if !limits.is_bounded() {
                    return Err(SequenceError::Unbounded(step.name.clone()));
                }
                if !limits.is_ordered() {
                    return Err(SequenceError::InvertedLimits(step.name.clone()));
                }
            }
        }

        Ok(Self {
            name,
            steps,
            policy,
        })
    }

    pub fn builder(name: impl Into<String>) -> SequenceBuilder {
        SequenceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn policy(&self) -> AbortPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed sequence
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Same steps under a different policy
    pub fn with_policy(mut self, policy: AbortPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Builder for sequences
pub struct SequenceBuilder {
    name: String,
    steps: Vec<StepDefinition>,
    policy: AbortPolicy,
}

impl SequenceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            policy: AbortPolicy::default(),
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn policy(mut self, policy: AbortPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Sequence, SequenceError> {
        Sequence::new(self.name, self.steps, self.policy)
    }
}
