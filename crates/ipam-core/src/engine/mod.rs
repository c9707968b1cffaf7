//! The generic reconcile engine
//!
//! One routine drives every resource kind: look the resource up by natural
//! key, then create, update, delete, or do nothing, reporting the
//! transition as a [`ChangeResult`].
//!
//! ```text
//! Descriptor ──► resolve references ──► lookup by natural key
//!                                             │
//!                  ┌──────────────────────────┴───────────────┐
//!                  ▼                                          ▼
//!            desired: present                           desired: absent
//!         not found → create                        found → delete
//!         found     → diff → update / no-op         not found → no-op
//! ```
//!
//! The engine owns every decision; the [`ResourceStore`] underneath is
//! transport only. No call is retried here and nothing is cached between
//! invocations — re-running with the same descriptor re-reads the remote
//! state and lands on `Unchanged`.

use crate::error::{Error, Result};
use crate::kinds::{self, FieldKind, KindSpec, NaturalKey, UpdateAddressing};
use crate::payload;
use crate::resource::{ChangeResult, Descriptor, DesiredState, ResourceKind};
use crate::traits::{LookupQuery, ResourceStore};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Name of the implicit routing domain used when a VLAN descriptor does not
/// name one
const DEFAULT_ROUTING_DOMAIN: &str = "default";

/// The generic reconcile operation, parameterized by a [`ResourceStore`]
pub struct Reconciler {
    store: Box<dyn ResourceStore>,
}

impl Reconciler {
    /// Create a reconciler on top of a store backend
    pub fn new(store: Box<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Access the underlying store
    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    /// Drive the remote resource described by `descriptor` to `state`
    ///
    /// Idempotent: a second call with unchanged inputs returns
    /// [`ChangeResult::Unchanged`] without mutating anything. Ensuring
    /// `absent` on a resource that does not exist is `Unchanged`, not an
    /// error.
    pub async fn ensure(
        &self,
        descriptor: &Descriptor,
        state: DesiredState,
    ) -> Result<ChangeResult> {
        let spec = kinds::spec(descriptor.kind);

        // When absenting, only the references the natural key needs are
        // resolved; a parent that no longer exists means the child cannot
        // exist either.
        let key_refs_only = state == DesiredState::Absent;
        let resolved = match self.resolve_references(descriptor, spec, key_refs_only).await {
            Ok(map) => map,
            Err(Error::Reference(msg)) if state == DesiredState::Absent => {
                debug!(
                    kind = %descriptor.kind,
                    key = %descriptor.key_display(),
                    "Parent reference gone while ensuring absent: {}",
                    msg
                );
                return Ok(ChangeResult::Unchanged);
            }
            Err(e) => return Err(e),
        };

        let query = self.key_query(descriptor, spec, &resolved)?;
        let current = self.store.lookup(descriptor.kind, &query).await?;

        match state {
            DesiredState::Absent => match current {
                Some(remote) => {
                    self.store.delete(descriptor.kind, &remote.id).await?;
                    info!(
                        kind = %descriptor.kind,
                        key = %descriptor.key_display(),
                        id = %remote.id,
                        "Deleted"
                    );
                    Ok(ChangeResult::Deleted)
                }
                None => {
                    debug!(
                        kind = %descriptor.kind,
                        key = %descriptor.key_display(),
                        "Already absent"
                    );
                    Ok(ChangeResult::Unchanged)
                }
            },
            DesiredState::Present => {
                let desired = payload::build(descriptor, &resolved)?;

                match current {
                    None => {
                        self.store.create(descriptor.kind, &desired).await?;
                        info!(
                            kind = %descriptor.kind,
                            key = %descriptor.key_display(),
                            "Created"
                        );
                        Ok(ChangeResult::Created)
                    }
                    Some(remote) => {
                        let mut changes = payload::diff(spec, &desired, &remote);
                        if changes.is_empty() {
                            debug!(
                                kind = %descriptor.kind,
                                key = %descriptor.key_display(),
                                "Up to date"
                            );
                            return Ok(ChangeResult::Unchanged);
                        }

                        // Some controllers insist on seeing certain fields
                        // on every update, changed or not.
                        for echo in spec.update_echo {
                            if !changes.contains_key(*echo)
                                && let Some(value) = remote.field(echo)
                            {
                                changes.insert((*echo).to_string(), value.clone());
                            }
                        }

                        if spec.update == UpdateAddressing::IdInBody {
                            changes.insert(
                                spec.id_field.to_string(),
                                Value::String(remote.id.clone()),
                            );
                        }

                        self.store.update(descriptor.kind, &remote.id, &changes).await?;
                        info!(
                            kind = %descriptor.kind,
                            key = %descriptor.key_display(),
                            id = %remote.id,
                            fields = changes.len(),
                            "Updated"
                        );
                        Ok(ChangeResult::Updated)
                    }
                }
            }
        }
    }

    /// Resolve reference fields to server-side ids
    ///
    /// Returns a map from descriptor field name to the referenced
    /// resource's id. With `key_refs_only`, only references the natural key
    /// depends on are resolved.
    async fn resolve_references(
        &self,
        descriptor: &Descriptor,
        spec: &KindSpec,
        key_refs_only: bool,
    ) -> Result<BTreeMap<String, String>> {
        let mut resolved = BTreeMap::new();

        let key_ref_field = match spec.key {
            NaturalKey::Cidr { section_field, .. } => Some(section_field),
            NaturalKey::NumberInDomain { domain_field, .. } => Some(domain_field),
            _ => None,
        };

        for field in spec.fields {
            let FieldKind::Ref(target) = field.kind else {
                continue;
            };
            if key_refs_only && Some(field.name) != key_ref_field {
                continue;
            }
            let Some(value) = descriptor.get(field.name) else {
                continue;
            };

            let id = self
                .resolve_kind_id(target, value, descriptor)
                .await?
                .ok_or_else(|| {
                    Error::reference(format!(
                        "Cannot resolve {} '{}' referenced by field '{}'",
                        target,
                        payload::value_to_string(value),
                        field.name
                    ))
                })?;
            resolved.insert(field.name.to_string(), id);
        }

        // A VLAN lookup is always scoped to a routing domain, named or not.
        if let NaturalKey::NumberInDomain { domain_field, .. } = spec.key
            && !resolved.contains_key(domain_field)
        {
            let default = Value::String(DEFAULT_ROUTING_DOMAIN.to_string());
            let id = self
                .resolve_kind_id(ResourceKind::L2Domain, &default, descriptor)
                .await?
                .ok_or_else(|| {
                    Error::reference(format!(
                        "Routing domain '{}' does not exist",
                        DEFAULT_ROUTING_DOMAIN
                    ))
                })?;
            resolved.insert(domain_field.to_string(), id);
        }

        Ok(resolved)
    }

    /// Look up the id of a referenced resource by its natural key
    async fn resolve_kind_id(
        &self,
        target: ResourceKind,
        value: &Value,
        descriptor: &Descriptor,
    ) -> Result<Option<String>> {
        let target_spec = kinds::spec(target);
        let key_value = payload::value_to_string(value);

        let query = match target_spec.key {
            NaturalKey::Path { .. } => LookupQuery::ByPath { value: key_value },
            NaturalKey::Filter { api_field, .. } => LookupQuery::ByFilter {
                field: api_field,
                value: key_value,
            },
            NaturalKey::NumberInDomain { domain_field, .. } => {
                // A VLAN reference is a number, scoped by the referring
                // descriptor's routing domain (or the implicit default).
                let domain = descriptor
                    .get_str(domain_field)
                    .unwrap_or_else(|| DEFAULT_ROUTING_DOMAIN.to_string());
                let domain_query = LookupQuery::ByFilter {
                    field: "name",
                    value: domain,
                };
                let Some(domain_id) = self
                    .store
                    .lookup(ResourceKind::L2Domain, &domain_query)
                    .await?
                    .map(|remote| remote.id)
                else {
                    return Ok(None);
                };
                LookupQuery::ByNumber {
                    number: key_value,
                    domain_id,
                }
            }
            NaturalKey::Cidr { .. } => {
                return Err(Error::invalid_input(format!(
                    "Kind '{}' cannot be used as a reference target",
                    target
                )));
            }
        };

        Ok(self
            .store
            .lookup(target, &query)
            .await?
            .map(|remote| remote.id))
    }

    /// Build the natural-key lookup for the reconciled resource itself
    fn key_query(
        &self,
        descriptor: &Descriptor,
        spec: &KindSpec,
        resolved: &BTreeMap<String, String>,
    ) -> Result<LookupQuery> {
        let key_value = |field: &str| {
            descriptor.get_str(field).ok_or_else(|| {
                Error::invalid_input(format!(
                    "Descriptor of kind '{}' is missing key field '{}'",
                    descriptor.kind, field
                ))
            })
        };

        match spec.key {
            NaturalKey::Path { field } => Ok(LookupQuery::ByPath {
                value: key_value(field)?,
            }),
            NaturalKey::Filter { field, api_field } => Ok(LookupQuery::ByFilter {
                field: api_field,
                value: key_value(field)?,
            }),
            NaturalKey::Cidr { field, section_field } => {
                let (subnet, mask) = payload::split_cidr(&key_value(field)?)?;
                let section_id = resolved.get(section_field).ok_or_else(|| {
                    Error::invalid_input(format!(
                        "Descriptor of kind '{}' is missing key field '{}'",
                        descriptor.kind, section_field
                    ))
                })?;
                Ok(LookupQuery::ByCidr {
                    subnet,
                    mask,
                    section_id: section_id.clone(),
                })
            }
            NaturalKey::NumberInDomain { field, domain_field } => {
                let domain_id = resolved.get(domain_field).ok_or_else(|| {
                    Error::reference(format!(
                        "Routing domain for kind '{}' was not resolved",
                        descriptor.kind
                    ))
                })?;
                Ok(LookupQuery::ByNumber {
                    number: key_value(field)?,
                    domain_id: domain_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Fields;
    use crate::resource::RemoteResource;
    use async_trait::async_trait;

    /// Store double that fails on any use; for paths that must error before
    /// any API call.
    struct UnreachableStore;

    #[async_trait]
    impl ResourceStore for UnreachableStore {
        async fn lookup(
            &self,
            _kind: ResourceKind,
            _query: &LookupQuery,
        ) -> Result<Option<RemoteResource>> {
            panic!("store must not be reached");
        }

        async fn create(&self, _kind: ResourceKind, _payload: &Fields) -> Result<()> {
            panic!("store must not be reached");
        }

        async fn update(&self, _kind: ResourceKind, _id: &str, _payload: &Fields) -> Result<()> {
            panic!("store must not be reached");
        }

        async fn delete(&self, _kind: ResourceKind, _id: &str) -> Result<()> {
            panic!("store must not be reached");
        }

        fn store_name(&self) -> &'static str {
            "unreachable"
        }
    }

    #[tokio::test]
    async fn missing_key_field_is_rejected_before_any_api_call() {
        let reconciler = Reconciler::new(Box::new(UnreachableStore));
        let desc = Descriptor::new(ResourceKind::Tag).field("bg_color", "red");
        let err = reconciler
            .ensure(&desc, DesiredState::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err}");
    }

    #[tokio::test]
    async fn subnet_without_section_is_rejected() {
        let reconciler = Reconciler::new(Box::new(UnreachableStore));
        let desc = Descriptor::new(ResourceKind::Subnet).field("cidr", "10.0.0.0/24");
        let err = reconciler
            .ensure(&desc, DesiredState::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err}");
    }
}
