// # Resource Store Trait
//
// Defines the interface between the reconcile engine and the remote API.
//
// ## Implementations
//
// - phpIPAM REST: `ipam-client-phpipam` crate
// - In-memory mock: `tests/common/mod.rs` (contract tests)
//
// ## Trust boundary
//
// Store implementations are transport only. They MUST NOT:
// - retry or back off (the caller owns failure policy)
// - cache records between calls (idempotence comes from remote lookup)
// - decide whether a mutation is needed (owned by the `Reconciler`)
//
// Each method performs a single logical API operation and surfaces errors
// verbatim.

use crate::error::Result;
use crate::payload::Fields;
use crate::resource::{RemoteResource, ResourceKind};
use async_trait::async_trait;

/// A natural-key lookup, produced by the reconcile engine from the
/// per-kind mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    /// Address the record directly by name path
    ByPath {
        /// The key value
        value: String,
    },
    /// Server-side filter on a field
    ByFilter {
        /// API field to filter on
        field: &'static str,
        /// The key value
        value: String,
    },
    /// Subnet CIDR lookup scoped to a section
    ByCidr {
        /// Network part of the CIDR
        subnet: String,
        /// Prefix length
        mask: String,
        /// Id of the owning section
        section_id: String,
    },
    /// VLAN number lookup scoped to a routing domain
    ByNumber {
        /// The VLAN number
        number: String,
        /// Id of the routing domain
        domain_id: String,
    },
}

/// Trait for remote resource API backends
///
/// # Thread Safety
///
/// Implementations must be thread-safe; the engine itself only ever issues
/// one call at a time.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Look up a resource by natural key
    ///
    /// Returns `Ok(None)` when the key matches nothing — "not found" is an
    /// ordinary reconcile input, not an error.
    async fn lookup(
        &self,
        kind: ResourceKind,
        query: &LookupQuery,
    ) -> Result<Option<RemoteResource>>;

    /// Create a resource from an API payload
    async fn create(&self, kind: ResourceKind, payload: &Fields) -> Result<()>;

    /// Update an existing resource
    ///
    /// `payload` holds only the changed fields (plus whatever the kind's
    /// addressing style requires); `id` is the server-assigned identifier.
    async fn update(&self, kind: ResourceKind, id: &str, payload: &Fields) -> Result<()>;

    /// Delete an existing resource by id
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()>;

    /// Backend name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
