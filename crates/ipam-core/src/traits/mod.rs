//! Trait definitions for pluggable backends

mod store;

pub use store::{LookupQuery, ResourceStore};
