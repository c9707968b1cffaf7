//! Minimal embedding example for ipam-core
//!
//! This example demonstrates using ipam-core as a library in a custom
//! application with a custom store backend. No phpIPAM server is needed:
//! the store below keeps records in process memory.

use ipam_core::error::Result;
use ipam_core::kinds;
use ipam_core::payload::{Fields, value_to_string};
use ipam_core::resource::{Descriptor, RemoteResource, ResourceKind};
use ipam_core::scenario::{self, conformance};
use ipam_core::traits::{LookupQuery, ResourceStore};
use ipam_core::{DesiredState, Reconciler};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Custom store for embedded usage: a toy in-memory IPAM
struct EmbeddedStore {
    records: Mutex<HashMap<ResourceKind, Vec<RemoteResource>>>,
    next_id: AtomicUsize,
}

impl EmbeddedStore {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for EmbeddedStore {
    async fn lookup(
        &self,
        kind: ResourceKind,
        query: &LookupQuery,
    ) -> Result<Option<RemoteResource>> {
        let records = self.records.lock().unwrap();
        let matches = |r: &&RemoteResource| {
            let eq = |name: &str, expected: &str| {
                r.field(name).is_some_and(|v| value_to_string(v) == expected)
            };
            match query {
                LookupQuery::ByPath { value } => eq("name", value),
                LookupQuery::ByFilter { field, value } => eq(field, value),
                LookupQuery::ByCidr { subnet, mask, section_id } => {
                    eq("subnet", subnet) && eq("mask", mask) && eq("sectionId", section_id)
                }
                LookupQuery::ByNumber { number, domain_id } => {
                    eq("number", number) && eq("domainId", domain_id)
                }
            }
        };
        Ok(records
            .get(&kind)
            .and_then(|rs| rs.iter().find(matches))
            .cloned())
    }

    async fn create(&self, kind: ResourceKind, payload: &Fields) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut fields = payload.clone();
        fields.insert(
            kinds::spec(kind).id_field.to_string(),
            serde_json::Value::String(id.clone()),
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
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records
            .get_mut(&kind)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == id))
        {
            for (key, value) in payload {
                record.fields.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(rs) = records.get_mut(&kind) {
            rs.retain(|r| r.id != id);
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded ipam-core Example ===\n");

    // The reconciler works against any store implementation.
    let reconciler = Reconciler::new(Box::new(EmbeddedStore::new()));

    // Single reconcile calls
    println!("1. Single reconcile calls...");
    let tag = Descriptor::new(ResourceKind::Tag)
        .field("name", "managed")
        .field("bg_color", "red");

    let first = reconciler.ensure(&tag, DesiredState::Present).await?;
    let second = reconciler.ensure(&tag, DesiredState::Present).await?;
    println!("   first run:  {}", first);
    println!("   second run: {} (idempotent)", second);

    // Whole scenarios
    println!("\n2. Running the built-in conformance suite...");
    for scenario_def in conformance::suite() {
        let report = scenario::run(&reconciler, &scenario_def).await?;
        println!(
            "   {}: {} step(s), changed: {}",
            report.name,
            report.outcomes.len(),
            report.changed
        );
    }

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- The reconcile engine is independent of the HTTP backend");
    println!("- Any ResourceStore implementation plugs in");
    println!("- Idempotence comes from remote lookup, not local state");

    Ok(())
}
