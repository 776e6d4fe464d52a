//! Sequence execution engine
//!
//! The state-free sequence runner plus the station that drives units through
//! it, retries failures and reports each attempt.

mod batch;
mod retry;
mod runner;
mod station;

pub use batch::{BatchSummary, StepStats};
pub use retry::RetryPolicy;
pub use runner::{overall_passed, SequenceRunner};
pub use station::{Attempt, Delivery, Station, StationConfig, UnitReport};
