//! Static per-kind mapping table
//!
//! Everything that varies between resource kinds lives here as data: the
//! controller URI, the natural key and how to look it up, how updates are
//! addressed, and the writable field list with API renames. The reconcile
//! routine itself is kind-agnostic.
//!
//! Controller names and addressing quirks follow the phpIPAM REST API:
//! most controllers are plural (`sections`, `subnets`), `vlan` is not, and
//! the `tools/*` controllers address updates by id in the path rather than
//! in the body. VLAN records carry their id in `vlanId` instead of `id`.

use crate::resource::ResourceKind;

/// How a descriptor field is treated when building API payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Passed through (renamed) as-is
    Scalar,
    /// Normalized to the API's `"1"`/`"0"` encoding
    Bool,
    /// A CIDR like `10.0.0.0/24`, split into `subnet` + `mask` API fields
    Cidr,
    /// Name of another resource, resolved to its id
    Ref(ResourceKind),
    /// Input-only: consumed during lookup/resolution, never sent to the API
    Meta,
}

/// One writable descriptor field and its API-side mapping
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Descriptor-side (snake_case) field name
    pub name: &'static str,
    /// API-side field name
    pub api_name: &'static str,
    /// How the field is encoded
    pub kind: FieldKind,
}

/// How the natural key of a kind is located on the server
#[derive(Debug, Clone, Copy)]
pub enum NaturalKey {
    /// `GET {controller}/{value}/` — controllers addressable by name path
    Path {
        /// Descriptor field holding the key value
        field: &'static str,
    },
    /// `GET {controller}/?filter_by={api_field}&filter_value={value}`
    Filter {
        /// Descriptor field holding the key value
        field: &'static str,
        /// API field to filter on (tags store their name in `type`)
        api_field: &'static str,
    },
    /// `GET subnets/cidr/{subnet}/{mask}/`, filtered by section id
    Cidr {
        /// Descriptor field holding the CIDR
        field: &'static str,
        /// Descriptor field naming the owning section
        section_field: &'static str,
    },
    /// VLAN number within a routing domain
    NumberInDomain {
        /// Descriptor field holding the VLAN number
        field: &'static str,
        /// Descriptor field naming the routing domain
        domain_field: &'static str,
    },
}

impl NaturalKey {
    /// The descriptor field that carries the key value
    pub fn field(&self) -> &'static str {
        match self {
            NaturalKey::Path { field }
            | NaturalKey::Filter { field, .. }
            | NaturalKey::Cidr { field, .. }
            | NaturalKey::NumberInDomain { field, .. } => field,
        }
    }
}

/// How update requests are addressed for a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAddressing {
    /// `PATCH {controller}/` with the id carried in the body
    IdInBody,
    /// `PATCH {controller}/{id}/` (tools controllers and `vlan`)
    IdInPath,
}

/// Complete mapping for one resource kind
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    /// The kind this spec describes
    pub kind: ResourceKind,
    /// Controller URI relative to the API base
    pub controller: &'static str,
    /// Field carrying the server-assigned id in API responses
    pub id_field: &'static str,
    /// Natural key lookup strategy
    pub key: NaturalKey,
    /// Update addressing style
    pub update: UpdateAddressing,
    /// Writable fields
    pub fields: &'static [FieldSpec],
    /// Desired-side API field → remote-side API field fallbacks for diffing.
    /// The l2domains controller returns `sections` for what it accepts as
    /// `permissions` (upstream phpIPAM issue #3190).
    pub read_aliases: &'static [(&'static str, &'static str)],
    /// API fields that must be echoed from the remote record on every
    /// update even when unchanged (the vlan controller rejects updates
    /// without `name`)
    pub update_echo: &'static [&'static str],
}

const SECTION: KindSpec = KindSpec {
    kind: ResourceKind::Section,
    controller: "sections",
    id_field: "id",
    key: NaturalKey::Path { field: "name" },
    update: UpdateAddressing::IdInBody,
    fields: &[
        FieldSpec { name: "name", api_name: "name", kind: FieldKind::Scalar },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "strict_mode", api_name: "strictMode", kind: FieldKind::Bool },
        FieldSpec { name: "show_vlan", api_name: "showVLAN", kind: FieldKind::Bool },
        FieldSpec { name: "show_vrf", api_name: "showVRF", kind: FieldKind::Bool },
    ],
    read_aliases: &[],
    update_echo: &[],
};

const L2DOMAIN: KindSpec = KindSpec {
    kind: ResourceKind::L2Domain,
    controller: "l2domains",
    id_field: "id",
    key: NaturalKey::Filter { field: "name", api_field: "name" },
    update: UpdateAddressing::IdInBody,
    fields: &[
        FieldSpec { name: "name", api_name: "name", kind: FieldKind::Scalar },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "sections", api_name: "permissions", kind: FieldKind::Scalar },
    ],
    read_aliases: &[("permissions", "sections")],
    update_echo: &[],
};

const VLAN: KindSpec = KindSpec {
    kind: ResourceKind::Vlan,
    controller: "vlan",
    id_field: "vlanId",
    key: NaturalKey::NumberInDomain { field: "number", domain_field: "routing_domain" },
    update: UpdateAddressing::IdInPath,
    fields: &[
        FieldSpec { name: "number", api_name: "number", kind: FieldKind::Scalar },
        FieldSpec { name: "name", api_name: "name", kind: FieldKind::Scalar },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "routing_domain", api_name: "domainId", kind: FieldKind::Ref(ResourceKind::L2Domain) },
    ],
    read_aliases: &[],
    update_echo: &["name"],
};

const SUBNET: KindSpec = KindSpec {
    kind: ResourceKind::Subnet,
    controller: "subnets",
    id_field: "id",
    key: NaturalKey::Cidr { field: "cidr", section_field: "section" },
    update: UpdateAddressing::IdInBody,
    fields: &[
        FieldSpec { name: "cidr", api_name: "subnet", kind: FieldKind::Cidr },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "section", api_name: "sectionId", kind: FieldKind::Ref(ResourceKind::Section) },
        FieldSpec { name: "vlan", api_name: "vlanId", kind: FieldKind::Ref(ResourceKind::Vlan) },
        // Consumed when resolving the `vlan` reference; not an API field.
        FieldSpec { name: "routing_domain", api_name: "routing_domain", kind: FieldKind::Meta },
        FieldSpec { name: "show_name", api_name: "showName", kind: FieldKind::Bool },
        FieldSpec { name: "allow_requests", api_name: "allowRequests", kind: FieldKind::Bool },
    ],
    read_aliases: &[],
    update_echo: &[],
};

const LOCATION: KindSpec = KindSpec {
    kind: ResourceKind::Location,
    controller: "tools/locations",
    id_field: "id",
    key: NaturalKey::Filter { field: "name", api_field: "name" },
    update: UpdateAddressing::IdInPath,
    fields: &[
        FieldSpec { name: "name", api_name: "name", kind: FieldKind::Scalar },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "address", api_name: "address", kind: FieldKind::Scalar },
        FieldSpec { name: "lat", api_name: "lat", kind: FieldKind::Scalar },
        FieldSpec { name: "long", api_name: "long", kind: FieldKind::Scalar },
    ],
    read_aliases: &[],
    update_echo: &[],
};

const TAG: KindSpec = KindSpec {
    kind: ResourceKind::Tag,
    controller: "tools/tags",
    id_field: "id",
    // Tags keep their display name in the `type` field.
    key: NaturalKey::Filter { field: "name", api_field: "type" },
    update: UpdateAddressing::IdInPath,
    fields: &[
        FieldSpec { name: "name", api_name: "type", kind: FieldKind::Scalar },
        FieldSpec { name: "description", api_name: "description", kind: FieldKind::Scalar },
        FieldSpec { name: "bg_color", api_name: "bgcolor", kind: FieldKind::Scalar },
        FieldSpec { name: "fg_color", api_name: "fgcolor", kind: FieldKind::Scalar },
        FieldSpec { name: "show_tag", api_name: "showtag", kind: FieldKind::Bool },
    ],
    read_aliases: &[],
    update_echo: &[],
};

/// Mapping specs for all supported kinds
pub const KINDS: &[KindSpec] = &[SECTION, L2DOMAIN, VLAN, SUBNET, LOCATION, TAG];

/// Look up the mapping for a kind
pub fn spec(kind: ResourceKind) -> &'static KindSpec {
    match kind {
        ResourceKind::Section => &SECTION,
        ResourceKind::L2Domain => &L2DOMAIN,
        ResourceKind::Vlan => &VLAN,
        ResourceKind::Subnet => &SUBNET,
        ResourceKind::Location => &LOCATION,
        ResourceKind::Tag => &TAG,
    }
}

impl KindSpec {
    /// Find a field spec by descriptor-side name
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_spec() {
        for kind in ResourceKind::ALL {
            assert_eq!(spec(kind).kind, kind);
        }
        assert_eq!(KINDS.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn natural_key_field_is_a_writable_field() {
        // The key must be buildable from the descriptor for lookup and
        // (except Meta fields) present in create payloads.
        for ks in KINDS {
            assert!(
                ks.field(ks.key.field()).is_some(),
                "kind {} key field {} missing from field list",
                ks.kind,
                ks.key.field()
            );
        }
    }

    #[test]
    fn tools_controllers_address_updates_by_path() {
        assert_eq!(spec(ResourceKind::Location).update, UpdateAddressing::IdInPath);
        assert_eq!(spec(ResourceKind::Tag).update, UpdateAddressing::IdInPath);
        assert_eq!(spec(ResourceKind::Vlan).update, UpdateAddressing::IdInPath);
        assert_eq!(spec(ResourceKind::Section).update, UpdateAddressing::IdInBody);
    }

    #[test]
    fn vlan_id_field_and_echo() {
        let ks = spec(ResourceKind::Vlan);
        assert_eq!(ks.id_field, "vlanId");
        assert_eq!(ks.update_echo, &["name"]);
    }

    #[test]
    fn tag_name_maps_to_type() {
        let ks = spec(ResourceKind::Tag);
        assert_eq!(ks.field("name").unwrap().api_name, "type");
        match ks.key {
            NaturalKey::Filter { api_field, .. } => assert_eq!(api_field, "type"),
            _ => panic!("tag key should be a filter lookup"),
        }
    }
}
