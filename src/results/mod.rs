//! Local storage of run submissions
//!
//! Holds submissions that could not be delivered and exports them.

mod outbox;

pub use outbox::{ExportFormat, FlushReport, Outbox, OutboxEntry};
