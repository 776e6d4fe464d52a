//! Unit-under-test identities
//!
//! Serial number generation and the sub-unit serial pool shared between
//! producer and consumer fixtures.

mod generator;
mod pool;

pub use generator::{IdentityGenerator, UnitTemplate};
pub use pool::{PoolDrain, PoolError, SerialPool};
