//! Fixture Runner - manufacturing test fixture sequencer
//!
//! Runs ordered test sequences against units under test, derives a single
//! pass/fail verdict per run and reports every run to a test-management
//! service.
//!
//! ## Features
//!
//! - Boolean, numeric (limit-checked) and string steps
//! - Run-all and abort-on-first-failure policies
//! - Serial number generation and sub-unit pools shared between fixtures
//! - HTTP or offline file reporting, with an outbox for failed deliveries
//! - Seeded measurement simulation for every fixture in the catalog

pub mod cli;
pub mod config;
pub mod executor;
pub mod fixtures;
pub mod identity;
pub mod measurement;
pub mod models;
pub mod output;
pub mod report;
pub mod results;
pub mod utils;
