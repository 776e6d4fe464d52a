//! Test station
//!
//! Drives units of one fixture through identity generation, sequence runs
//! under the retry policy and reporting. Units are processed one at a time.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::batch::BatchSummary;
use super::retry::RetryPolicy;
use super::runner::SequenceRunner;
use crate::fixtures::{Fixture, SubUnitSource};
use crate::identity::{IdentityGenerator, PoolDrain, PoolError, SerialPool, UnitTemplate};
use crate::measurement::{MeasurementSource, SimulatedSource};
use crate::models::{AbortPolicy, SequenceResult, SubUnit, UnitIdentity};
use crate::report::{variables, DurationMode, Receipt, ReportEmitter, RunSubmission};
use crate::results::Outbox;
use crate::utils::Timer;

/// Station settings that override what the fixture declares
#[derive(Clone, Debug)]
pub struct StationConfig {
    pub retry: Option<RetryPolicy>,
    pub policy: Option<AbortPolicy>,
    pub duration_mode: DurationMode,
    pub suffix_length: Option<usize>,
    pub static_segment: Option<String>,
    pub seed: Option<u64>,
    /// Directory holding the sub-unit pool files
    pub pool_dir: PathBuf,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            retry: None,
            policy: None,
            duration_mode: DurationMode::default(),
            suffix_length: None,
            static_segment: None,
            seed: None,
            pool_dir: PathBuf::from("pools"),
        }
    }
}

/// What happened to an attempt's submission
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Sent(Receipt),
    /// Emission failed; `path` is the outbox file if one was written
    Queued { error: String, path: Option<PathBuf> },
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent(_))
    }
}

/// One run of the sequence for one unit
#[derive(Clone, Debug, Serialize)]
pub struct Attempt {
    pub number: u32,
    pub result: SequenceResult,
    pub submission: RunSubmission,
    pub delivery: Delivery,
}

/// Every attempt made on one unit
#[derive(Clone, Debug, Serialize)]
pub struct UnitReport {
    pub identity: UnitIdentity,
    pub attempts: Vec<Attempt>,
}

impl UnitReport {
    /// Verdict of the last attempt
    pub fn passed(&self) -> bool {
        self.attempts
            .last()
            .map(|a| a.result.overall_passed())
            .unwrap_or(false)
    }

    pub fn first_pass(&self) -> bool {
        self.attempts
            .first()
            .map(|a| a.result.overall_passed())
            .unwrap_or(false)
    }

    pub fn final_result(&self) -> Option<&SequenceResult> {
        self.attempts.last().map(|a| &a.result)
    }

    pub fn reporting_failures(&self) -> usize {
        self.attempts.iter().filter(|a| !a.delivery.is_sent()).count()
    }
}

/// Sub-unit serials for the units of one batch
enum SubUnitFeed {
    None,
    Fixed(Vec<SubUnit>),
    Pool {
        name: String,
        drain: PoolDrain,
        count: usize,
    },
}

impl SubUnitFeed {
    fn next(&mut self) -> Result<Vec<SubUnit>, PoolError> {
        match self {
            SubUnitFeed::None => Ok(Vec::new()),
            SubUnitFeed::Fixed(sub_units) => Ok(sub_units.clone()),
            SubUnitFeed::Pool { drain, count, .. } => drain.take(*count),
        }
    }

    /// Return entries not taken to the pool, in their original order
    fn put_back(self, pool_dir: &Path) -> Result<(), PoolError> {
        if let SubUnitFeed::Pool { name, drain, .. } = self {
            let pool = SerialPool::in_dir(pool_dir, &name);
            for serial in drain.into_leftovers() {
                pool.append(&serial)?;
            }
        }
        Ok(())
    }

    fn finish(self) {
        if let SubUnitFeed::Pool { name, drain, .. } = self {
            let leftovers = drain.into_leftovers();
            if !leftovers.is_empty() {
                warn!(
                    "Discarding {} unused serial(s) from pool {}: {}",
                    leftovers.len(),
                    name,
                    leftovers.join(", ")
                );
            }
        }
    }
}

/// Runs units of one fixture and reports every attempt
pub struct Station<S, E> {
    fixture: Fixture,
    config: StationConfig,
    template: UnitTemplate,
    runner: SequenceRunner<S>,
    generator: IdentityGenerator,
    emitter: E,
    outbox: Option<Outbox>,
}

impl<E: ReportEmitter> Station<SimulatedSource, E> {
    /// Station measuring through the fixture's own simulation plan
    pub fn simulated(fixture: Fixture, emitter: E, config: StationConfig) -> Self {
        let source = SimulatedSource::new(fixture.plan.clone(), config.seed);
        Self::new(fixture, source, emitter, config)
    }
}

impl<S: MeasurementSource, E: ReportEmitter> Station<S, E> {
    pub fn new(fixture: Fixture, source: S, emitter: E, config: StationConfig) -> Self {
        let mut template = fixture.template.clone();
        if let Some(len) = config.suffix_length {
            template.suffix_length = len;
        }
        if let Some(segment) = &config.static_segment {
            template.static_segment = segment.clone();
        }

        let generator = IdentityGenerator::new(config.seed.map(|s| s.wrapping_add(1)));

        Self {
            fixture,
            config,
            template,
            runner: SequenceRunner::new(source),
            generator,
            emitter,
            outbox: None,
        }
    }

    /// Keep undeliverable submissions in an outbox
    pub fn with_outbox(mut self, outbox: Outbox) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.unwrap_or(self.fixture.retry)
    }

    pub fn abort_policy(&self) -> AbortPolicy {
        self.config.policy.unwrap_or(self.fixture.sequence.policy())
    }

    fn pool(&self, name: &str) -> SerialPool {
        SerialPool::in_dir(&self.config.pool_dir, name)
    }

    /// Sub-unit feed for `units` units; checks the pool before draining it
    fn open_feed(&self, units: usize) -> Result<SubUnitFeed, PoolError> {
        match &self.fixture.sub_units {
            SubUnitSource::None => Ok(SubUnitFeed::None),
            SubUnitSource::Fixed { serials } => Ok(SubUnitFeed::Fixed(
                serials.iter().map(SubUnit::new).collect(),
            )),
            SubUnitSource::Pool { name, count } => {
                let pool = self.pool(name);
                let requested = units * count;
                let available = pool.peek()?.len();
                if available < requested {
                    return Err(PoolError::Underrun {
                        requested,
                        available,
                    });
                }
                Ok(SubUnitFeed::Pool {
                    name: name.clone(),
                    drain: pool.drain()?,
                    count: *count,
                })
            }
        }
    }

    /// Test one unit, taking sub-units from the fixture's source
    ///
    /// A pool-fed fixture takes only this unit's entries; the rest stay in
    /// the pool for later calls.
    pub fn run_unit(&mut self) -> Result<UnitReport, PoolError> {
        let mut feed = self.open_feed(1)?;
        let sub_units = feed.next()?;
        feed.put_back(&self.config.pool_dir)?;
        self.run_unit_with(sub_units)
    }

    /// Test one unit built from the given sub-units
    pub fn run_unit_with(&mut self, sub_units: Vec<SubUnit>) -> Result<UnitReport, PoolError> {
        let identity = self
            .generator
            .generate_for(&self.template)
            .with_sub_units(sub_units);
        info!("Testing {} on {}", identity, self.fixture.name);

        if let Some(pool) = &self.fixture.produces {
            self.pool(pool).append(&identity.serial_number)?;
        }

        let retry = self.retry_policy();
        let policy = self.abort_policy();
        let mut attempts = Vec::new();

        for number in 1..=retry.max_attempts() {
            let result = self.runner.run_with_policy(&self.fixture.sequence, policy);
            let passed = result.overall_passed();
            info!(
                "{} attempt {}/{}: {}",
                identity.serial_number,
                number,
                retry.max_attempts(),
                if passed { "PASS" } else { "FAIL" }
            );

            let submission = self.submission(&identity, &result);
            let delivery = self.deliver(&submission);
            attempts.push(Attempt {
                number,
                result,
                submission,
                delivery,
            });

            if !retry.should_retry(number, passed) {
                break;
            }
        }

        Ok(UnitReport { identity, attempts })
    }

    /// Test `units` units in sequence
    pub fn run_batch(&mut self, units: usize) -> Result<(Vec<UnitReport>, BatchSummary), PoolError> {
        let timer = Timer::start(format!("batch {}", self.fixture.name));
        info!(
            "Starting batch of {} unit(s) on {} ({})",
            units, self.fixture.name, self.fixture.procedure_id
        );

        let mut feed = self.open_feed(units)?;
        let mut reports = Vec::with_capacity(units);
        for _ in 0..units {
            let sub_units = feed.next()?;
            reports.push(self.run_unit_with(sub_units)?);
        }
        feed.finish();

        let summary = BatchSummary::from_reports(
            self.fixture.name,
            &self.fixture.procedure_id,
            &reports,
            timer.stop().as_millis() as u64,
        );
        info!(
            "Batch done: FPY {:.1}%, final yield {:.1}%, {} reporting failure(s)",
            summary.first_pass_yield(),
            summary.final_yield(),
            summary.reporting_failures
        );

        Ok((reports, summary))
    }

    fn submission(&self, identity: &UnitIdentity, result: &SequenceResult) -> RunSubmission {
        let report_variables =
            variables::render_all(&self.fixture.report_variables, identity, result, Utc::now());
        RunSubmission::from_result(
            &self.fixture.procedure_id,
            identity,
            result,
            self.config.duration_mode,
        )
        .with_report_variables(report_variables)
    }

    fn deliver(&self, submission: &RunSubmission) -> Delivery {
        match self.emitter.emit(submission) {
            Ok(receipt) => Delivery::Sent(receipt),
            Err(error) => {
                warn!(
                    "Reporting failed for {}: {}",
                    submission.serial_number(),
                    error
                );
                let path = self.outbox.as_ref().and_then(|outbox| {
                    outbox
                        .store(submission)
                        .map_err(|e| warn!("Could not queue submission: {:#}", e))
                        .ok()
                });
                Delivery::Queued {
                    error: error.to_string(),
                    path,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::measurement::Sample;
    use crate::models::{Reading, StepDefinition, StepFault, StepKind};
    use crate::report::ReportingError;
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Readings that pass (or fail) every step of any sequence
    fn always(pass: bool) -> impl FnMut(&StepDefinition) -> Result<Sample, StepFault> {
        move |step: &StepDefinition| -> Result<Sample, StepFault> {
            let reading = match &step.kind {
                StepKind::Boolean => Reading::Flag(pass),
                StepKind::Numeric { limits, .. } => {
                    let inside = limits.low.or(limits.high).unwrap_or(0.0);
                    let outside = match (limits.low, limits.high) {
                        (_, Some(high)) => high + 1.0,
                        (Some(low), None) => low - 1.0,
                        (None, None) => f64::NAN,
                    };
                    Reading::Number(if pass { inside } else { outside })
                }
                StepKind::String { expected } => {
                    Reading::Text(if pass { expected.clone() } else { "wrong".to_string() })
                }
            };
            Ok(reading.into())
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<RunSubmission>>,
    }

    impl ReportEmitter for Recorder {
        fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError> {
            self.sent.borrow_mut().push(submission.clone());
            Ok(Receipt {
                id: format!("run_{}", self.sent.borrow().len()),
                url: None,
            })
        }
    }

    struct Offline;

    impl ReportEmitter for Offline {
        fn emit(&self, _: &RunSubmission) -> Result<Receipt, ReportingError> {
            Err(ReportingError::ConnectionRefused("http://localhost:1".to_string()))
        }
    }

    fn fixture(name: &str) -> Fixture {
        fixtures::by_name(name).unwrap().unwrap()
    }

    fn config(pool_dir: &std::path::Path) -> StationConfig {
        StationConfig {
            seed: Some(42),
            pool_dir: pool_dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_passing_unit_single_attempt() {
        let dir = tempdir().unwrap();
        let recorder = Recorder::default();
        let mut station = Station::new(fixture("motor"), always(true), &recorder, config(dir.path()));

        let report = station.run_unit().unwrap();
        assert!(report.passed());
        assert!(report.first_pass());
        assert_eq!(report.attempts.len(), 1);
        assert!(station.fixture().template.matches(&report.identity.serial_number));

        let sent = recorder.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].procedure_id, "FVT1");
        assert_eq!(sent[0].steps.len(), 14);
        assert_eq!(sent[0].report_variables["motor_serial_number"], report.identity.serial_number);
    }

    #[test]
    fn test_failing_unit_is_retried_and_every_attempt_reported() {
        let dir = tempdir().unwrap();
        let recorder = Recorder::default();
        let mut station = Station::new(
            fixture("pcba-rf-motherboard"),
            always(false),
            &recorder,
            config(dir.path()),
        );

        let report = station.run_unit().unwrap();
        assert!(!report.passed());
        assert_eq!(report.attempts.len(), 6);
        assert_eq!(recorder.sent.borrow().len(), 6);
        // abort-on-first-failure: only the first step ran
        assert!(report.attempts.iter().all(|a| a.result.len() == 1));
        assert!(report
            .attempts
            .iter()
            .all(|a| a.submission.serial_number() == report.identity.serial_number));
    }

    #[test]
    fn test_retry_override() {
        let dir = tempdir().unwrap();
        let cfg = StationConfig {
            retry: Some(RetryPolicy::none()),
            ..config(dir.path())
        };
        let mut station = Station::new(fixture("pcba-rf-motherboard"), always(false), Recorder::default(), cfg);
        assert_eq!(station.run_unit().unwrap().attempts.len(), 1);
    }

    #[test]
    fn test_policy_override_runs_all_steps() {
        let dir = tempdir().unwrap();
        let cfg = StationConfig {
            policy: Some(AbortPolicy::RunAll),
            ..config(dir.path())
        };
        let mut station = Station::new(fixture("motor"), always(false), Recorder::default(), cfg);
        let report = station.run_unit().unwrap();
        assert_eq!(report.final_result().unwrap().len(), 14);
    }

    #[test]
    fn test_producer_and_consumer_share_pool() {
        let dir = tempdir().unwrap();

        let mut producer = Station::new(
            fixture("pcba-rf-motherboard"),
            always(true),
            Recorder::default(),
            config(dir.path()),
        );
        let (produced, _) = producer.run_batch(3).unwrap();

        let pool = SerialPool::in_dir(dir.path(), "pcba-rf");
        assert_eq!(pool.peek().unwrap().len(), 3);

        let recorder = Recorder::default();
        let mut consumer = Station::new(fixture("pcba-rf-assembly"), always(true), &recorder, config(dir.path()));
        let (reports, summary) = consumer.run_batch(2).unwrap();

        assert_eq!(summary.units, 2);
        assert_eq!(reports[0].identity.sub_units[0].serial_number, produced[0].identity.serial_number);
        assert_eq!(reports[1].identity.sub_units[0].serial_number, produced[1].identity.serial_number);
        assert_eq!(recorder.sent.borrow()[0].sub_units.len(), 1);
        // third serial was drained with the rest and discarded
        assert!(pool.peek().unwrap().is_empty());
    }

    #[test]
    fn test_single_units_take_pool_entries_one_by_one() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::in_dir(dir.path(), "pcba-rf");
        for serial in ["00375A4J00001", "00375A4J00002", "00375A4J00003"] {
            pool.append(serial).unwrap();
        }

        let mut consumer = Station::new(
            fixture("pcba-rf-assembly"),
            always(true),
            Recorder::default(),
            config(dir.path()),
        );
        let first = consumer.run_unit().unwrap();
        let second = consumer.run_unit().unwrap();

        assert_eq!(first.identity.sub_units[0].serial_number, "00375A4J00001");
        assert_eq!(second.identity.sub_units[0].serial_number, "00375A4J00002");
        assert_eq!(pool.peek().unwrap(), vec!["00375A4J00003".to_string()]);
    }

    #[test]
    fn test_pool_underrun_leaves_pool_intact() {
        let dir = tempdir().unwrap();
        let pool = SerialPool::in_dir(dir.path(), "pcba-rf");
        pool.append("00375A4J00001").unwrap();

        let mut consumer = Station::new(
            fixture("pcba-rf-assembly"),
            always(true),
            Recorder::default(),
            config(dir.path()),
        );
        let err = consumer.run_batch(2).unwrap_err();
        assert!(matches!(
            err,
            PoolError::Underrun {
                requested: 2,
                available: 1
            }
        ));
        assert_eq!(pool.peek().unwrap(), vec!["00375A4J00001".to_string()]);
    }

    #[test]
    fn test_fixed_sub_units_and_measured_report_variables() {
        let dir = tempdir().unwrap();
        let recorder = Recorder::default();
        let mut station = Station::new(fixture("battery-assembly"), always(true), &recorder, config(dir.path()));
        station.run_unit().unwrap();

        let sent = recorder.sent.borrow();
        assert_eq!(sent[0].sub_units.len(), 2);
        assert_eq!(sent[0].report_variables["voltage_test_result"], "10");
        assert_eq!(sent[0].report_variables["safety_test_result"], "Passed all safety tests");
        assert_eq!(sent[0].report_variables["batch_number"], "1024");
    }

    #[test]
    fn test_failed_delivery_goes_to_outbox() {
        let dir = tempdir().unwrap();
        let outbox_dir = dir.path().join("outbox");
        let mut station = Station::new(fixture("pcba-power"), always(true), Offline, config(dir.path()))
            .with_outbox(Outbox::new(&outbox_dir));

        let (reports, summary) = station.run_batch(2).unwrap();
        assert_eq!(summary.reporting_failures, 2);
        assert!(reports.iter().all(|r| r.passed()));
        match &reports[0].attempts[0].delivery {
            Delivery::Queued { path: Some(path), .. } => assert!(path.exists()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Outbox::new(&outbox_dir).len().unwrap(), 2);
    }

    #[test]
    fn test_simulated_station_is_reproducible() {
        let dir = tempdir().unwrap();
        let run = || {
            let mut station =
                Station::simulated(fixture("climatic-chamber"), Recorder::default(), config(dir.path()));
            let (reports, summary) = station.run_batch(5).unwrap();
            let serials: Vec<_> = reports.iter().map(|r| r.identity.serial_number.clone()).collect();
            (serials, summary.final_pass)
        };
        assert_eq!(run(), run());
    }
}
