//! Serial number generation
//!
//! Serial = part number + revision + static segment + fixed-width numeric suffix.
//! Suffix digits are uniform over 0-9 and may start with zeros. Collisions are
//! possible and accepted; uniqueness belongs to the reporting service.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::UnitIdentity;

/// Static parts of a unit's identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub part_number: String,
    pub revision: String,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default = "default_static_segment")]
    pub static_segment: String,
    #[serde(default = "default_suffix_length")]
    pub suffix_length: usize,
}

pub fn default_static_segment() -> String {
    "4J".to_string()
}

pub fn default_suffix_length() -> usize {
    5
}

impl UnitTemplate {
    pub fn new(part_number: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            part_number: part_number.into(),
            revision: revision.into(),
            batch_number: None,
            static_segment: default_static_segment(),
            suffix_length: default_suffix_length(),
        }
    }

    pub fn batch(mut self, batch_number: impl Into<String>) -> Self {
        self.batch_number = Some(batch_number.into());
        self
    }

    pub fn static_segment(mut self, segment: impl Into<String>) -> Self {
        self.static_segment = segment.into();
        self
    }

    pub fn suffix_length(mut self, len: usize) -> Self {
        self.suffix_length = len;
        self
    }

    /// Everything before the random suffix
    pub fn prefix(&self) -> String {
        format!("{}{}{}", self.part_number, self.revision, self.static_segment)
    }

    /// Check that a serial has this template's prefix and a suffix of exactly
    /// `suffix_length` ASCII digits
    pub fn matches(&self, serial: &str) -> bool {
        match serial.strip_prefix(&self.prefix()) {
            Some(suffix) => {
                suffix.len() == self.suffix_length && suffix.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    }
}

/// Produces unit identities from templates
pub struct IdentityGenerator<R = StdRng> {
    rng: R,
}

impl IdentityGenerator<StdRng> {
    /// Seed from the OS unless a seed is given
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed.unwrap_or_else(rand::random)),
        }
    }
}

impl<R: Rng> IdentityGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Fixed-width string of uniform random digits
    pub fn suffix(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.rng.random_range(0..10u8)))
            .collect()
    }

    pub fn generate(
        &mut self,
        part_number: &str,
        revision: &str,
        batch_number: Option<&str>,
        suffix_length: usize,
        static_segment: &str,
    ) -> UnitIdentity {
        let suffix = self.suffix(suffix_length);
        UnitIdentity {
            part_number: part_number.to_string(),
            revision: revision.to_string(),
            batch_number: batch_number.map(str::to_string),
            serial_number: format!("{part_number}{revision}{static_segment}{suffix}"),
            sub_units: Vec::new(),
        }
    }

    pub fn generate_for(&mut self, template: &UnitTemplate) -> UnitIdentity {
        self.generate(
            &template.part_number,
            &template.revision,
            template.batch_number.as_deref(),
            template.suffix_length,
            &template.static_segment,
        )
    }
}
