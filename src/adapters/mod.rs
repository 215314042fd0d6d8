//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the fee engine to external systems:
//! - `memory` - In-memory store implementing every port, for tests and demos
//! - `postgres` - PostgreSQL implementations backed by sqlx
//! - `SystemClock` / `FixedClock` - Clock implementations

mod clock;
pub mod memory;
pub mod postgres;

pub use clock::{FixedClock, SystemClock};
pub use memory::InMemoryFeeStore;
