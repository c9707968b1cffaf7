//! Test doubles and common utilities for reconcile contract tests
//!
//! `MockStore` is an in-memory stand-in for a phpIPAM server: records live
//! in a shared map keyed by kind, lookups apply the same natural-key
//! matching the real API performs, and every operation is counted so tests
//! can assert on exactly which calls a reconcile made.

use ipam_core::error::{Error, Result};
use ipam_core::kinds;
use ipam_core::payload::{Fields, value_to_string};
use ipam_core::resource::{RemoteResource, ResourceKind};
use ipam_core::traits::{LookupQuery, ResourceStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type RecordMap = HashMap<ResourceKind, Vec<RemoteResource>>;

/// An in-memory ResourceStore that tracks calls
pub struct MockStore {
    /// Stored records by kind
    records: Arc<Mutex<RecordMap>>,
    /// Next server-assigned id
    next_id: Arc<AtomicUsize>,
    /// Call counter for lookup()
    lookup_calls: Arc<AtomicUsize>,
    /// Call counter for create()
    create_calls: Arc<AtomicUsize>,
    /// Call counter for update()
    update_calls: Arc<AtomicUsize>,
    /// Call counter for delete()
    delete_calls: Arc<AtomicUsize>,
    /// When set, create() fails with an API error
    fail_creates: Arc<AtomicBool>,
    /// Payload of the most recent update()
    last_update: Arc<Mutex<Option<Fields>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            lookup_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            fail_creates: Arc::new(AtomicBool::new(false)),
            last_update: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a new MockStore that shares records and counters with an
    /// existing one (the reconciler takes ownership of its store, so tests
    /// keep a sharing handle for assertions)
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            next_id: Arc::clone(&other.next_id),
            lookup_calls: Arc::clone(&other.lookup_calls),
            create_calls: Arc::clone(&other.create_calls),
            update_calls: Arc::clone(&other.update_calls),
            delete_calls: Arc::clone(&other.delete_calls),
            fail_creates: Arc::clone(&other.fail_creates),
            last_update: Arc::clone(&other.last_update),
        }
    }

    pub fn lookup_call_count(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent create() fail
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    /// Payload of the most recent update()
    pub fn last_update_payload(&self) -> Option<Fields> {
        self.last_update.lock().unwrap().clone()
    }

    /// Number of records currently stored for a kind
    pub fn record_count(&self, kind: ResourceKind) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&kind)
            .map_or(0, |records| records.len())
    }

    fn matches(record: &RemoteResource, query: &LookupQuery) -> bool {
        let field_eq = |name: &str, expected: &str| {
            record
                .field(name)
                .is_some_and(|v| value_to_string(v) == expected)
        };

        match query {
            LookupQuery::ByPath { value } => field_eq("name", value),
            LookupQuery::ByFilter { field, value } => field_eq(field, value),
            LookupQuery::ByCidr {
                subnet,
                mask,
                section_id,
            } => field_eq("subnet", subnet) && field_eq("mask", mask) && field_eq("sectionId", section_id),
            LookupQuery::ByNumber { number, domain_id } => {
                field_eq("number", number) && field_eq("domainId", domain_id)
            }
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockStore {
    async fn lookup(
        &self,
        kind: ResourceKind,
        query: &LookupQuery,
    ) -> Result<Option<RemoteResource>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&kind)
            .and_then(|records| records.iter().find(|r| Self::matches(r, query)))
            .cloned())
    }

    async fn create(&self, kind: ResourceKind, payload: &Fields) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::api("mock", "create failed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut fields = payload.clone();
        fields.insert(
            kinds::spec(kind).id_field.to_string(),
            Value::String(id.clone()),
        );

        self.records
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(RemoteResource { id, fields });
        Ok(())
    }

    async fn update(&self, kind: ResourceKind, id: &str, payload: &Fields) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some(payload.clone());

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&kind)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| Error::not_found(format!("mock: no {} with id {}", kind, id)))?;

        for (key, value) in payload {
            record.fields.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let kind_records = records
            .get_mut(&kind)
            .ok_or_else(|| Error::not_found(format!("mock: no {} with id {}", kind, id)))?;
        let before = kind_records.len();
        kind_records.retain(|r| r.id != id);
        if kind_records.len() == before {
            return Err(Error::not_found(format!("mock: no {} with id {}", kind, id)));
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}
