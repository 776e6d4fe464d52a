//! Sequence result models
//!
//! Records of executed steps and the derived pass/fail verdict of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::sequence::AbortPolicy;
use super::step::{StepDefinition, StepOutcome};

/// One executed step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub definition: StepDefinition,
    pub outcome: StepOutcome,
    pub started_at: DateTime<Utc>,
    /// Measured wall-clock time of the step
    pub duration: Duration,
}

impl StepRecord {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn passed(&self) -> bool {
        self.outcome.passed
    }

    pub fn status_symbol(&self) -> &'static str {
        if self.outcome.passed {
            "✓"
        } else if self.outcome.is_fault() {
            "!"
        } else {
            "✗"
        }
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status_symbol(),
            self.definition.name,
            self.duration.as_millis()
        )?;
        if let Some(value) = &self.outcome.measured_value {
            write!(f, " = {value}")?;
            if let Some(unit) = &self.outcome.unit {
                write!(f, " {unit}")?;
            }
        }
        if let Some(fault) = &self.outcome.fault {
            write!(f, " - {fault}")?;
        }
        Ok(())
    }
}

/// Ordered records of one run of a sequence; never modified after the run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceResult {
    sequence: String,
    policy: AbortPolicy,
    defined_steps: usize,
    records: Vec<StepRecord>,
}

impl SequenceResult {
    pub fn new(
        sequence: impl Into<String>,
        policy: AbortPolicy,
        defined_steps: usize,
        records: Vec<StepRecord>,
    ) -> Self {
        Self {
            sequence: sequence.into(),
            policy,
            defined_steps,
            records,
        }
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn policy(&self) -> AbortPolicy {
        self.policy
    }

    /// Number of steps the sequence defines, executed or not
    pub fn defined_steps(&self) -> usize {
        self.defined_steps
    }

    /// Executed steps in order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// AND over every recorded outcome
    pub fn overall_passed(&self) -> bool {
        self.records.iter().all(|r| r.outcome.passed)
    }

    /// Run stopped before executing every defined step
    pub fn is_aborted(&self) -> bool {
        self.records.len() < self.defined_steps
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    pub fn faults(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_fault()).count()
    }

    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.records.iter().find(|r| !r.outcome.passed)
    }

    pub fn record(&self, name: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.definition.name == name)
    }

    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(|r| r.duration).sum()
    }
}

impl fmt::Display for SequenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sequence {} ({})", self.sequence, self.policy)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for record in &self.records {
            writeln!(f, "  {record}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Executed: {}/{} | Pass: {} | Fail: {} | Verdict: {}",
            self.records.len(),
            self.defined_steps,
            self.passed(),
            self.failed(),
            if self.overall_passed() { "PASS" } else { "FAIL" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepOutcome;

    fn record(name: &str, passed: bool) -> StepRecord {
        StepRecord {
            definition: StepDefinition::boolean(name, 1),
            outcome: StepOutcome::flag(passed),
            started_at: Utc::now(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_overall_passed_is_and() {
        let result = SequenceResult::new(
            "s",
            AbortPolicy::RunAll,
            3,
            vec![record("a", true), record("b", false), record("c", true)],
        );
        assert!(!result.overall_passed());
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.first_failure().map(|r| r.name()), Some("b"));
        assert!(!result.is_aborted());
    }

    #[test]
    fn test_aborted_prefix() {
        let result = SequenceResult::new(
            "s",
            AbortPolicy::AbortOnFirstFailure,
            3,
            vec![record("a", false)],
        );
        assert!(result.is_aborted());
        assert_eq!(result.total_duration(), Duration::from_millis(5));
    }

    #[test]
    fn test_result_exposes_run_read_only() {
        let result = SequenceResult::new(
            "power",
            AbortPolicy::AbortOnFirstFailure,
            4,
            vec![record("a", true), record("b", false)],
        );
        assert_eq!(result.sequence(), "power");
        assert_eq!(result.policy(), AbortPolicy::AbortOnFirstFailure);
        assert_eq!(result.defined_steps(), 4);
        let names: Vec<_> = result.records().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(result.is_aborted());
    }

    #[test]
    fn test_display_contains_verdict() {
        let result = SequenceResult::new("s", AbortPolicy::RunAll, 1, vec![record("a", true)]);
        assert!(result.to_string().contains("Verdict: PASS"));
    }
}
