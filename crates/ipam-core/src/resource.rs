//! Resource model: kinds, descriptors, desired state, reconcile outcomes
//!
//! A [`Descriptor`] is the desired-state description of a single remote
//! resource. A [`RemoteResource`] is what the server currently holds. The
//! [`Reconciler`](crate::engine::Reconciler) drives the latter to match the
//! former and reports the transition as a [`ChangeResult`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The supported phpIPAM resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Section (top-level subnet container)
    Section,
    /// Layer-2 routing domain
    #[serde(rename = "l2domain")]
    L2Domain,
    /// VLAN within a routing domain
    Vlan,
    /// Subnet within a section
    Subnet,
    /// Location (tools controller)
    Location,
    /// Tag (tools controller)
    Tag,
}

impl ResourceKind {
    /// All kinds, in dependency-safe provisioning order
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Section,
        ResourceKind::L2Domain,
        ResourceKind::Vlan,
        ResourceKind::Subnet,
        ResourceKind::Location,
        ResourceKind::Tag,
    ];

    /// Kind name as used in scenario files and logs
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Section => "section",
            ResourceKind::L2Domain => "l2domain",
            ResourceKind::Vlan => "vlan",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Location => "location",
            ResourceKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "section" => Ok(ResourceKind::Section),
            "l2domain" => Ok(ResourceKind::L2Domain),
            "vlan" => Ok(ResourceKind::Vlan),
            "subnet" => Ok(ResourceKind::Subnet),
            "location" => Ok(ResourceKind::Location),
            "tag" => Ok(ResourceKind::Tag),
            other => Err(crate::Error::invalid_input(format!(
                "Unknown resource kind: {}",
                other
            ))),
        }
    }
}

/// Target state for a reconcile operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// The resource should exist and match the descriptor
    #[default]
    Present,
    /// The resource should not exist
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => f.write_str("present"),
            DesiredState::Absent => f.write_str("absent"),
        }
    }
}

/// Outcome of a reconcile operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeResult {
    /// Remote state already matched the descriptor (no API mutation)
    Unchanged,
    /// The resource did not exist and was created
    Created,
    /// The resource existed with differing fields and was updated
    Updated,
    /// The resource existed and was deleted
    Deleted,
}

impl ChangeResult {
    /// Whether this outcome mutated remote state
    pub fn changed(self) -> bool {
        !matches!(self, ChangeResult::Unchanged)
    }
}

impl fmt::Display for ChangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeResult::Unchanged => f.write_str("unchanged"),
            ChangeResult::Created => f.write_str("created"),
            ChangeResult::Updated => f.write_str("updated"),
            ChangeResult::Deleted => f.write_str("deleted"),
        }
    }
}

/// Desired-state description of a single resource
///
/// Field keys use the descriptor-side (snake_case) names from the per-kind
/// mapping table; values are scalars or small nested records. The mapping to
/// API field names, boolean encoding, and reference resolution all happen in
/// [`payload`](crate::payload) and the [`Reconciler`](crate::engine::Reconciler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// The resource kind this descriptor targets
    pub kind: ResourceKind,

    /// Desired field values, keyed by descriptor-side field name
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Descriptor {
    /// Create an empty descriptor for a kind
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value, if present
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Get a field as a string, if present
    ///
    /// Non-string scalars (a VLAN number given as `1234`) are rendered to
    /// their canonical text form.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(crate::payload::value_to_string)
    }

    /// Human-readable natural key for logs and error messages
    pub fn key_display(&self) -> String {
        let spec = crate::kinds::spec(self.kind);
        self.get_str(spec.key.field())
            .unwrap_or_else(|| "<missing key>".to_string())
    }
}

/// A server-side resource record
///
/// Owned and persisted entirely by the remote API; never cached beyond the
/// scope of a single reconcile invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    /// Server-assigned identifier, as text
    pub id: String,

    /// Raw field map as returned by the API
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl RemoteResource {
    /// Get a field value, if present and non-null
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.name().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_serde_uses_wire_names() {
        let json = serde_json::to_string(&ResourceKind::L2Domain).unwrap();
        assert_eq!(json, "\"l2domain\"");
        let back: ResourceKind = serde_json::from_str("\"l2domain\"").unwrap();
        assert_eq!(back, ResourceKind::L2Domain);
    }

    #[test]
    fn desired_state_defaults_to_present() {
        assert_eq!(DesiredState::default(), DesiredState::Present);
    }

    #[test]
    fn change_result_changed_flag() {
        assert!(!ChangeResult::Unchanged.changed());
        assert!(ChangeResult::Created.changed());
        assert!(ChangeResult::Updated.changed());
        assert!(ChangeResult::Deleted.changed());
    }

    #[test]
    fn descriptor_builder_and_key_display() {
        let desc = Descriptor::new(ResourceKind::Tag)
            .field("name", "backbone")
            .field("bg_color", "red");
        assert_eq!(desc.get_str("name").as_deref(), Some("backbone"));
        assert_eq!(desc.key_display(), "backbone");
    }

    #[test]
    fn descriptor_deserializes_from_scenario_json() {
        let desc: Descriptor = serde_json::from_str(
            r#"{"kind": "subnet", "fields": {"cidr": "10.0.0.0/24", "section": "lab"}}"#,
        )
        .unwrap();
        assert_eq!(desc.kind, ResourceKind::Subnet);
        assert_eq!(desc.get_str("cidr").as_deref(), Some("10.0.0.0/24"));
    }
}
