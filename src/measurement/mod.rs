//! Measurement sources
//!
//! The runner asks a source for one reading per step. Real instrument drivers
//! and the seeded simulator both sit behind the same trait; closures work too,
//! which keeps tests deterministic.

mod simulated;

pub use simulated::{Simulation, SimulationPlan, SimulatedSource};

use std::path::PathBuf;

use crate::models::{Reading, StepDefinition, StepFault};

/// A reading plus an optional artifact (e.g. an inspection image)
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub reading: Reading,
    pub attachment: Option<PathBuf>,
}

impl Sample {
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

impl From<Reading> for Sample {
    fn from(reading: Reading) -> Self {
        Self {
            reading,
            attachment: None,
        }
    }
}

/// Produces a value for a given step
pub trait MeasurementSource {
    fn measure(&mut self, step: &StepDefinition) -> Result<Sample, StepFault>;
}

impl<F> MeasurementSource for F
where
    F: FnMut(&StepDefinition) -> Result<Sample, StepFault>,
{
    fn measure(&mut self, step: &StepDefinition) -> Result<Sample, StepFault> {
        self(step)
    }
}
