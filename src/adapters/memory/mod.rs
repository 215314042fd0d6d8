//! In-memory adapters.
//!
//! Every port backed by process memory, with staged transactions and
//! fault injection. Used by tests and for local runs without a database.

mod store;
mod transaction;

pub use store::{default_item_types, InMemoryFeeStore};
