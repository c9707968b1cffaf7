// # ipam-core
//
// Core library for declarative phpIPAM resource management.
//
// ## Architecture Overview
//
// This library provides the reconcile pattern that drives a remote IPAM
// resource to match a desired description:
//
// - **Descriptor / DesiredState**: what a resource should look like, and
//   whether it should exist at all
// - **ResourceStore**: trait for the remote API backend (lookup, create,
//   update, delete) — implemented by `ipam-client-phpipam`, mocked in tests
// - **Reconciler**: the generic lookup-then-reconcile operation, shared by
//   every resource kind
// - **kinds**: the static per-kind mapping table (endpoints, natural keys,
//   field renames, boolean fields, reference fields)
// - **scenario**: ordered execution of reconcile steps with optional
//   expected outcomes, plus the built-in conformance suite
//
// ## Design Principles
//
// 1. **One reconcile routine**: per-kind behavior lives in a data table,
//    not in duplicated logic
// 2. **No local state**: idempotence comes from remote lookup, never from
//    caching between invocations
// 3. **Single-shot calls**: the store performs one API call per operation;
//    retry policy belongs to the caller, not this layer
// 4. **Library-first**: everything `ipamctl` does is available as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod kinds;
pub mod payload;
pub mod resource;
pub mod scenario;
pub mod traits;

// Re-export core types for convenience
pub use config::{ScenarioFile, ServerConfig};
pub use engine::Reconciler;
pub use error::{Error, Result};
pub use resource::{ChangeResult, Descriptor, DesiredState, RemoteResource, ResourceKind};
pub use scenario::{Scenario, ScenarioReport, Step};
pub use traits::{LookupQuery, ResourceStore};
