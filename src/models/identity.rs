//! Unit-under-test identity models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a sub-unit tested in an earlier, independent run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnit {
    pub serial_number: String,
}

impl SubUnit {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
        }
    }
}

/// Identity of the physical item being tested
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentity {
    pub part_number: String,
    pub revision: String,
    pub batch_number: Option<String>,
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_units: Vec<SubUnit>,
}

impl UnitIdentity {
    pub fn with_sub_units(mut self, sub_units: Vec<SubUnit>) -> Self {
        self.sub_units = sub_units;
        self
    }
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (P/N {} rev {})",
            self.serial_number, self.part_number, self.revision
        )
    }
}
