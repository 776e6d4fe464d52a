//! Reporting to the test-management service
//!
//! Turns finished runs into submissions and delivers them over HTTP or to
//! local files. The runner never depends on this module.

mod emitter;
mod file;
mod http;
mod submission;
pub mod variables;

pub use emitter::{Receipt, ReportEmitter, ReportingError};
pub use file::FileEmitter;
pub(crate) use file::{sanitize, submission_stem, unique_path};
pub use http::HttpEmitter;
pub use submission::{iso_duration, DurationMode, RunSubmission, StepSubmission, UnitUnderTest};
