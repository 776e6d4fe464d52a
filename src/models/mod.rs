//! Data models for fixture sequences
//!
//! Steps, sequences, results and unit identities shared by the runner,
//! the identity generator and the report emitter.

mod identity;
mod result;
mod sequence;
mod step;

pub use identity::{SubUnit, UnitIdentity};
pub use result::{SequenceResult, StepRecord};
pub use sequence::{AbortPolicy, Sequence, SequenceBuilder, SequenceError};
pub use step::{
    Limits, MeasuredValue, Reading, StepDefinition, StepFault, StepKind, StepOutcome,
};
