//! # Store Module
//!
//! Entity store (hash fields, atomic counters, relation sets) and result store
//! (computed values addressed by [`crate::models::ResultLocator`]) contracts,
//! with in-memory implementations.

pub mod in_memory;
pub mod traits;

pub use in_memory::{InMemoryEntityStore, InMemoryResultStore};
pub use traits::{EntityStore, ResultStore};
