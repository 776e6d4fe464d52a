//! Sequence runner
//!
//! Executes the steps of a sequence in declaration order against a
//! measurement source and collects the records.

use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::measurement::{MeasurementSource, Sample};
use crate::models::{
    AbortPolicy, Sequence, SequenceResult, StepDefinition, StepFault, StepOutcome, StepRecord,
};
use crate::utils::Timer;

/// Runs sequences; holds no state besides its measurement source
pub struct SequenceRunner<S> {
    source: S,
}

impl<S: MeasurementSource> SequenceRunner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Run a sequence under its own abort policy
    pub fn run(&mut self, sequence: &Sequence) -> SequenceResult {
        self.run_with_policy(sequence, sequence.policy())
    }

    /// Run a sequence, overriding its abort policy
    pub fn run_with_policy(&mut self, sequence: &Sequence, policy: AbortPolicy) -> SequenceResult {
        info!(
            "Running sequence {} ({} steps, {})",
            sequence.name(),
            sequence.len(),
            policy
        );

        let mut records = Vec::with_capacity(sequence.len());

        for step in sequence.steps() {
            let record = self.run_step(step);
            debug!("  {}", record);

            let failed = !record.outcome.passed;
            records.push(record);

            if failed && policy == AbortPolicy::AbortOnFirstFailure {
                info!("Aborting {} after failed step {}", sequence.name(), step.name);
                break;
            }
        }

        SequenceResult::new(sequence.name(), policy, sequence.len(), records)
    }

    /// Execute one step; faults and panics become failing outcomes
    pub fn run_step(&mut self, step: &StepDefinition) -> StepRecord {
        let started_at = Utc::now();
        let timer = Timer::start(&step.name);

        let measured = panic::catch_unwind(AssertUnwindSafe(|| self.source.measure(step)))
            .unwrap_or_else(|payload| Err(StepFault::Panicked(panic_message(payload.as_ref()))));

        let outcome = match measured.and_then(|sample| evaluate(step, sample)) {
            Ok(outcome) => outcome,
            Err(fault) => {
                warn!("Step {} faulted: {}", step.name, fault);
                StepOutcome::faulted(&step.kind, &fault)
            }
        };

        StepRecord {
            definition: step.clone(),
            outcome,
            started_at,
            duration: timer.stop(),
        }
    }
}

fn evaluate(step: &StepDefinition, sample: Sample) -> Result<StepOutcome, StepFault> {
    let outcome = step.kind.evaluate(sample.reading)?;
    Ok(outcome.with_attachment(sample.attachment))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// AND over all recorded outcomes
pub fn overall_passed(result: &SequenceResult) -> bool {
    result.overall_passed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Limits, Reading};

    /// Power-on / input voltage / overcurrent protection, as on the power PCBA fixture
    fn power_sequence(policy: AbortPolicy) -> Sequence {
        Sequence::builder("pcba-power")
            .step(StepDefinition::boolean("power_on", 1))
            .step(StepDefinition::numeric("voltage", "V", Limits::range(20.0, 60.0), 3))
            .step(StepDefinition::numeric("overcurrent", "A", Limits::at_most(25.0), 3))
            .policy(policy)
            .build()
            .unwrap()
    }

    fn bench(step: &StepDefinition) -> Result<Sample, StepFault> {
        let reading = match step.name.as_str() {
            "power_on" => Reading::Flag(true),
            "voltage" => Reading::Number(45.0),
            "overcurrent" => Reading::Number(30.0),
            other => return Err(StepFault::UnknownStep(other.to_string())),
        };
        Ok(reading.into())
    }

    /// Source that passes or fails each step according to a script
    fn scripted(outcomes: Vec<bool>) -> impl FnMut(&StepDefinition) -> Result<Sample, StepFault> {
        let mut outcomes = outcomes.into_iter();
        move |_step: &StepDefinition| -> Result<Sample, StepFault> {
            Ok(Reading::Flag(outcomes.next().unwrap_or(true)).into())
        }
    }

    fn flag_sequence(len: usize, policy: AbortPolicy) -> Sequence {
        let mut builder = Sequence::builder("flags").policy(policy);
        for i in 0..len {
            builder = builder.step(StepDefinition::boolean(format!("step_{i}"), 1));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_run_all_records_every_step() {
        let mut runner = SequenceRunner::new(bench);
        let result = runner.run(&power_sequence(AbortPolicy::RunAll));

        assert_eq!(result.len(), 3);
        assert!(!overall_passed(&result));
        assert!(result.record("power_on").unwrap().passed());
        assert!(result.record("voltage").unwrap().passed());
        assert!(!result.record("overcurrent").unwrap().passed());
    }

    #[test]
    fn test_abort_when_first_step_fails() {
        let sequence = Sequence::builder("pcba-power")
            .step(StepDefinition::numeric("overcurrent", "A", Limits::at_most(25.0), 3))
            .step(StepDefinition::boolean("power_on", 1))
            .step(StepDefinition::numeric("voltage", "V", Limits::range(20.0, 60.0), 3))
            .policy(AbortPolicy::AbortOnFirstFailure)
            .build()
            .unwrap();

        let result = SequenceRunner::new(bench).run(&sequence);
        assert_eq!(result.len(), 1);
        assert!(!result.overall_passed());
        assert!(result.is_aborted());
    }

    #[test]
    fn test_prefix_length_under_abort_policy() {
        let len = 6;
        for first_failure in 0..len {
            let mut script = vec![true; len];
            script[first_failure] = false;
            // later failures must not matter
            if first_failure + 2 < len {
                script[first_failure + 2] = false;
            }

            let mut runner = SequenceRunner::new(scripted(script));
            let result = runner.run(&flag_sequence(len, AbortPolicy::AbortOnFirstFailure));
            assert_eq!(result.len(), first_failure + 1);
        }

        let mut runner = SequenceRunner::new(scripted(vec![true; len]));
        let result = runner.run(&flag_sequence(len, AbortPolicy::AbortOnFirstFailure));
        assert_eq!(result.len(), len);
        assert!(result.overall_passed());
    }

    #[test]
    fn test_run_all_length_is_sequence_length() {
        let scripts = [
            vec![true, true, true, true, true],
            vec![false, false, false, false, false],
            vec![true, false, true, false, true],
            vec![true, true, false, true, true],
        ];
        for script in scripts {
            let expected = script.iter().all(|p| *p);
            let mut runner = SequenceRunner::new(scripted(script));
            let result = runner.run(&flag_sequence(5, AbortPolicy::RunAll));
            assert_eq!(result.len(), 5);
            assert_eq!(result.overall_passed(), expected);
        }
    }

    #[test]
    fn test_third_step_failure_fails_run() {
        let mut runner = SequenceRunner::new(scripted(vec![true, true, false, true, true, true]));
        let result = runner.run(&flag_sequence(6, AbortPolicy::RunAll));
        assert_eq!(result.failed(), 1);
        assert!(!result.overall_passed());
    }

    #[test]
    fn test_policy_override() {
        let sequence = power_sequence(AbortPolicy::RunAll);
        let result = SequenceRunner::new(scripted(vec![false, true, true]))
            .run_with_policy(&sequence, AbortPolicy::AbortOnFirstFailure);
        assert_eq!(result.len(), 1);
        assert_eq!(result.policy(), AbortPolicy::AbortOnFirstFailure);
    }

    #[test]
    fn test_source_error_recorded_as_failure() {
        let source = |step: &StepDefinition| -> Result<Sample, StepFault> {
            if step.name == "voltage" {
                Err(StepFault::Source("DMM not responding".to_string()))
            } else {
                bench(step)
            }
        };
        let result = SequenceRunner::new(source).run(&power_sequence(AbortPolicy::RunAll));

        assert_eq!(result.len(), 3);
        let voltage = result.record("voltage").unwrap();
        assert!(!voltage.passed());
        assert_eq!(
            voltage.outcome.fault.as_deref(),
            Some("Measurement source failed: DMM not responding")
        );
        assert_eq!(voltage.outcome.limit_low, Some(20.0));
        assert_eq!(result.faults(), 1);
    }

    #[test]
    fn test_panicking_step_recorded_as_failure() {
        let source = |step: &StepDefinition| -> Result<Sample, StepFault> {
            if step.name == "power_on" {
                panic!("relay driver crashed");
            }
            bench(step)
        };
        let result = SequenceRunner::new(source).run(&power_sequence(AbortPolicy::RunAll));

        assert_eq!(result.len(), 3);
        let power_on = result.record("power_on").unwrap();
        assert!(!power_on.passed());
        assert_eq!(
            power_on.outcome.fault.as_deref(),
            Some("Step panicked: relay driver crashed")
        );
        assert!(result.record("voltage").unwrap().passed());
    }

    #[test]
    fn test_kind_mismatch_recorded_as_failure() {
        let source = |_: &StepDefinition| -> Result<Sample, StepFault> {
            Ok(Reading::Text("oops".to_string()).into())
        };
        let result = SequenceRunner::new(source).run(&power_sequence(AbortPolicy::AbortOnFirstFailure));
        assert_eq!(result.len(), 1);
        assert!(result.records()[0].outcome.is_fault());
    }

    #[test]
    fn test_records_are_in_declaration_order() {
        let result = SequenceRunner::new(bench).run(&power_sequence(AbortPolicy::RunAll));
        let names: Vec<_> = result.records().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["power_on", "voltage", "overcurrent"]);
        assert!(result.records()[0].started_at <= result.records()[2].started_at);
    }

    #[test]
    fn test_attachment_recorded() {
        let source = |_: &StepDefinition| -> Result<Sample, StepFault> {
            Ok(Sample::from(Reading::Flag(true)).with_attachment("motor_connector.png"))
        };
        let sequence = flag_sequence(1, AbortPolicy::RunAll);
        let result = SequenceRunner::new(source).run(&sequence);
        assert_eq!(
            result.records()[0].outcome.attachment.as_deref(),
            Some(std::path::Path::new("motor_connector.png"))
        );
    }
}
