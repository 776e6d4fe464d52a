//! Batch statistics
//!
//! Aggregates the unit reports of one batch into yields and per-step pass
//! rates.

use serde::Serialize;
use std::collections::BTreeMap;

use super::station::UnitReport;

/// Pass statistics for one step across every attempt of a batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub executed: u32,
    pub passed: u32,
}

impl StepStats {
    pub fn failed(&self) -> u32 {
        self.executed - self.passed
    }

    /// Percentage of executions that passed
    pub fn pass_rate(&self) -> f64 {
        if self.executed > 0 {
            (self.passed as f64 / self.executed as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Summary of a batch of units run on one fixture
#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub fixture: String,
    pub procedure_id: String,
    pub units: usize,
    /// Units that passed on their first attempt
    pub first_pass: usize,
    /// Units whose last attempt passed
    pub final_pass: usize,
    pub attempts: usize,
    pub reporting_failures: usize,
    pub duration_ms: u64,
    pub step_stats: BTreeMap<String, StepStats>,
}

impl BatchSummary {
    pub fn from_reports(
        fixture: impl Into<String>,
        procedure_id: impl Into<String>,
        reports: &[UnitReport],
        duration_ms: u64,
    ) -> Self {
        let mut step_stats: BTreeMap<String, StepStats> = BTreeMap::new();

        for attempt in reports.iter().flat_map(|r| r.attempts.iter()) {
            for record in attempt.result.records() {
                let stats = step_stats.entry(record.definition.name.clone()).or_default();
                stats.executed += 1;
                if record.outcome.passed {
                    stats.passed += 1;
                }
            }
        }

        Self {
            fixture: fixture.into(),
            procedure_id: procedure_id.into(),
            units: reports.len(),
            first_pass: reports.iter().filter(|r| r.first_pass()).count(),
            final_pass: reports.iter().filter(|r| r.passed()).count(),
            attempts: reports.iter().map(|r| r.attempts.len()).sum(),
            reporting_failures: reports.iter().map(|r| r.reporting_failures()).sum(),
            duration_ms,
            step_stats,
        }
    }

    /// First-pass yield in percent
    pub fn first_pass_yield(&self) -> f64 {
        percentage(self.first_pass, self.units)
    }

    /// Final yield in percent, retries included
    pub fn final_yield(&self) -> f64 {
        percentage(self.final_pass, self.units)
    }

    /// Steps ordered by pass rate, lowest first
    pub fn weakest_steps(&self) -> Vec<(&str, f64)> {
        let mut steps: Vec<_> = self
            .step_stats
            .iter()
            .map(|(name, stats)| (name.as_str(), stats.pass_rate()))
            .collect();
        steps.sort_by(|a, b| a.1.total_cmp(&b.1));
        steps
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
