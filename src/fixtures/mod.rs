//! Fixture catalog
//!
//! A fixture bundles everything a station needs to test one product: the
//! unit template, the step sequence, how each step is simulated, report
//! variables and where sub-unit serials come from.

mod battery;
mod chamber;
mod motor;
mod pcba;

use serde::Serialize;
use std::fmt;

use crate::executor::RetryPolicy;
use crate::identity::UnitTemplate;
use crate::measurement::SimulationPlan;
use crate::models::{Sequence, SequenceError};

/// Where a fixture's sub-unit serials come from
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubUnitSource {
    #[default]
    None,
    /// The same serials on every unit
    Fixed { serials: Vec<String> },
    /// `count` serials per unit from a named pool
    Pool { name: String, count: usize },
}

impl fmt::Display for SubUnitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubUnitSource::None => write!(f, "none"),
            SubUnitSource::Fixed { serials } => write!(f, "fixed ({})", serials.join(", ")),
            SubUnitSource::Pool { name, count } => write!(f, "{count} from pool {name}"),
        }
    }
}

/// One product's test fixture
#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: &'static str,
    pub description: &'static str,
    pub procedure_id: String,
    pub template: UnitTemplate,
    pub sequence: Sequence,
    pub plan: SimulationPlan,
    /// `(key, template)` pairs rendered after each attempt
    pub report_variables: Vec<(String, String)>,
    pub sub_units: SubUnitSource,
    /// Pool that receives the serial of every unit tested here
    pub produces: Option<String>,
    pub retry: RetryPolicy,
}

impl Fixture {
    pub fn new(
        name: &'static str,
        description: &'static str,
        procedure_id: impl Into<String>,
        template: UnitTemplate,
        sequence: Sequence,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            name,
            description,
            procedure_id: procedure_id.into(),
            template,
            sequence,
            plan,
            report_variables: Vec::new(),
            sub_units: SubUnitSource::None,
            produces: None,
            retry: RetryPolicy::none(),
        }
    }

    pub fn report_variable(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.report_variables.push((key.into(), template.into()));
        self
    }

    pub fn sub_units(mut self, source: SubUnitSource) -> Self {
        self.sub_units = source;
        self
    }

    pub fn produces(mut self, pool: impl Into<String>) -> Self {
        self.produces = Some(pool.into());
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Steps the sequence declares but the plan cannot simulate
    pub fn unsimulated_steps(&self) -> Vec<&str> {
        self.sequence
            .steps()
            .iter()
            .filter(|s| self.plan.get(&s.name).is_none())
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// Every fixture, in catalog order
pub fn all() -> Result<Vec<Fixture>, SequenceError> {
    Ok(vec![
        motor::motor()?,
        chamber::climatic_chamber()?,
        pcba::power()?,
        pcba::rf_motherboard()?,
        pcba::rf_assembly()?,
        battery::cell()?,
        battery::pcb()?,
        battery::assembly()?,
    ])
}

/// Look a fixture up by name
pub fn by_name(name: &str) -> Result<Option<Fixture>, SequenceError> {
    Ok(all()?.into_iter().find(|f| f.name == name))
}

/// Catalog names, in order
pub fn names() -> Vec<&'static str> {
    vec![
        "motor",
        "climatic-chamber",
        "pcba-power",
        "pcba-rf-motherboard",
        "pcba-rf-assembly",
        "battery-cell",
        "battery-pcb",
        "battery-assembly",
    ]
}
