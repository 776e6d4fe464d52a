//! Simulated measurements
//!
//! Each step draws a pass/fail decision from a fixed probability (the step's
//! first-pass yield) and then a value from the matching range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::{MeasurementSource, Sample};
use crate::models::{Reading, StepDefinition, StepFault};

/// How to fake the reading of one step
#[derive(Clone, Debug, PartialEq)]
pub enum Simulation {
    /// Boolean step passing with the given probability
    Flag { pass_probability: f64 },

    /// Numeric value drawn from `pass` or `fail`, rounded to `decimals`
    Number {
        pass_probability: f64,
        pass: (f64, f64),
        fail: (f64, f64),
        decimals: u32,
    },

    /// Always the same value
    Constant(f64),

    /// One of two literals
    Text {
        pass_probability: f64,
        pass: String,
        fail: String,
    },
}

impl Simulation {
    pub fn flag(pass_probability: f64) -> Self {
        Simulation::Flag { pass_probability }
    }

    pub fn number(pass_probability: f64, pass: (f64, f64), fail: (f64, f64), decimals: u32) -> Self {
        Simulation::Number {
            pass_probability,
            pass,
            fail,
            decimals,
        }
    }

    pub fn text(pass_probability: f64, pass: impl Into<String>, fail: impl Into<String>) -> Self {
        Simulation::Text {
            pass_probability,
            pass: pass.into(),
            fail: fail.into(),
        }
    }

    /// Draw a reading
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Reading {
        match self {
            Simulation::Flag { pass_probability } => {
                Reading::Flag(rng.random_bool(pass_probability.clamp(0.0, 1.0)))
            }
            Simulation::Number {
                pass_probability,
                pass,
                fail,
                decimals,
            } => {
                let (low, high) = if rng.random_bool(pass_probability.clamp(0.0, 1.0)) {
                    *pass
                } else {
                    *fail
                };
                Reading::Number(round_to(uniform(rng, low, high), *decimals))
            }
            Simulation::Constant(value) => Reading::Number(*value),
            Simulation::Text {
                pass_probability,
                pass,
                fail,
            } => {
                if rng.random_bool(pass_probability.clamp(0.0, 1.0)) {
                    Reading::Text(pass.clone())
                } else {
                    Reading::Text(fail.clone())
                }
            }
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    rng.random_range(low..=high)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Clone, Debug)]
struct StepSimulation {
    simulation: Simulation,
    attachment: Option<PathBuf>,
}

/// Simulations keyed by step name
#[derive(Clone, Debug, Default)]
pub struct SimulationPlan {
    steps: HashMap<String, StepSimulation>,
}

impl SimulationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, name: impl Into<String>, simulation: Simulation) -> Self {
        self.steps.insert(
            name.into(),
            StepSimulation {
                simulation,
                attachment: None,
            },
        );
        self
    }

    /// Attach an artifact to every sample of the named step
    pub fn attach(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        if let Some(step) = self.steps.get_mut(name) {
            step.attachment = Some(path.into());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Simulation> {
        self.steps.get(name).map(|s| &s.simulation)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Seeded simulator standing in for fixture hardware
pub struct SimulatedSource {
    plan: SimulationPlan,
    rng: StdRng,
}

impl SimulatedSource {
    /// Seed from the OS unless a seed is given
    pub fn new(plan: SimulationPlan, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        debug!("Simulated source seeded with {}", seed);
        Self {
            plan,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl MeasurementSource for SimulatedSource {
    fn measure(&mut self, step: &StepDefinition) -> Result<Sample, StepFault> {
        let entry = self
            .plan
            .steps
            .get(&step.name)
            .ok_or_else(|| StepFault::UnknownStep(step.name.clone()))?;

        Ok(Sample {
            reading: entry.simulation.sample(&mut self.rng),
            attachment: entry.attachment.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certain_flags() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(Simulation::flag(1.0).sample(&mut rng), Reading::Flag(true));
            assert_eq!(Simulation::flag(0.0).sample(&mut rng), Reading::Flag(false));
        }
    }

    #[test]
    fn test_number_ranges_and_rounding() {
        let mut rng = StdRng::seed_from_u64(11);
        let always_pass = Simulation::number(1.0, (11.5, 12.5), (10.0, 11.0), 1);
        for _ in 0..500 {
            match always_pass.sample(&mut rng) {
                Reading::Number(v) => {
                    assert!((11.5..=12.5).contains(&v));
                    assert_eq!(round_to(v, 1), v);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        let always_fail = Simulation::number(0.0, (0.0, 1.5), (1.6, 2.0), 2);
        for _ in 0..500 {
            match always_fail.sample(&mut rng) {
                Reading::Number(v) => assert!((1.6..=2.0).contains(&v)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let plan = SimulationPlan::new()
            .step("voltage", Simulation::number(0.5, (20.0, 60.0), (0.0, 10.0), 0))
            .step("firmware", Simulation::text(0.5, "1.4.3", "Unknown"));
        let steps = [
            StepDefinition::boolean("voltage", 1),
            StepDefinition::boolean("firmware", 1),
        ];

        let mut a = SimulatedSource::new(plan.clone(), Some(42));
        let mut b = SimulatedSource::new(plan, Some(42));
        for _ in 0..50 {
            for step in &steps {
                assert_eq!(a.measure(step).unwrap(), b.measure(step).unwrap());
            }
        }
    }

    #[test]
    fn test_unknown_step_faults() {
        let mut source = SimulatedSource::new(SimulationPlan::new(), Some(1));
        let err = source
            .measure(&StepDefinition::boolean("missing", 1))
            .unwrap_err();
        assert_eq!(err, StepFault::UnknownStep("missing".to_string()));
    }

    #[test]
    fn test_attachment_travels_with_sample() {
        let plan = SimulationPlan::new()
            .step("visual", Simulation::flag(1.0))
            .attach("visual", "images/connector.png");
        let mut source = SimulatedSource::new(plan, Some(3));
        let sample = source.measure(&StepDefinition::boolean("visual", 1)).unwrap();
        assert_eq!(sample.attachment, Some(PathBuf::from("images/connector.png")));
    }
}
