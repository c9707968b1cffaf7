//! Payload building and field-level diffing
//!
//! Descriptors use snake_case field names and whatever scalar types are
//! convenient (`true`, `1234`, `"yes"`). The API wants camelCase names and
//! strings, with booleans encoded as `"1"`/`"0"`. This module owns that
//! translation in both directions so the diff never produces a false
//! `updated` from an encoding mismatch.

use crate::error::{Error, Result};
use crate::kinds::{FieldKind, KindSpec};
use crate::resource::{Descriptor, RemoteResource};
use serde_json::Value;
use std::collections::BTreeMap;

/// An API-side field map (payload or diff)
pub type Fields = BTreeMap<String, Value>;

/// Interpret a textual boolean
///
/// Accepted spellings are a strict allowlist; anything else is `None`
/// rather than being coerced.
pub fn truthy(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalize a boolean-valued field to the API's `"1"`/`"0"` encoding
pub fn normalize_bool(value: &Value) -> Result<&'static str> {
    let normalized = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => truthy(s),
        _ => None,
    };

    match normalized {
        Some(true) => Ok("1"),
        Some(false) => Ok("0"),
        None => Err(Error::invalid_input(format!(
            "Not a boolean value: {}",
            value
        ))),
    }
}

/// Canonical text form of a scalar value, for API payloads and comparison
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a CIDR string into its subnet and mask parts
pub fn split_cidr(cidr: &str) -> Result<(String, String)> {
    let (subnet, mask) = cidr
        .split_once('/')
        .ok_or_else(|| Error::invalid_input(format!("Not in CIDR notation: {}", cidr)))?;

    if subnet.is_empty() {
        return Err(Error::invalid_input(format!("Empty subnet in CIDR: {}", cidr)));
    }

    // Prefix length bounds cover both address families.
    let prefix: u8 = mask
        .parse()
        .map_err(|_| Error::invalid_input(format!("Invalid prefix length in CIDR: {}", cidr)))?;
    if prefix > 128 {
        return Err(Error::invalid_input(format!(
            "Prefix length out of range in CIDR: {}",
            cidr
        )));
    }

    Ok((subnet.to_string(), mask.to_string()))
}

/// Build the desired API payload for a descriptor
///
/// `resolved` carries the ids of reference fields, keyed by descriptor
/// field name; the [`Reconciler`](crate::engine::Reconciler) fills it in
/// before calling here. Unknown descriptor fields are rejected rather than
/// silently passed through.
pub fn build(descriptor: &Descriptor, resolved: &BTreeMap<String, String>) -> Result<Fields> {
    let spec = crate::kinds::spec(descriptor.kind);
    let mut payload = Fields::new();

    for (name, value) in &descriptor.fields {
        let field = spec.field(name).ok_or_else(|| {
            Error::invalid_input(format!(
                "Unknown field '{}' for kind '{}'",
                name, descriptor.kind
            ))
        })?;

        match field.kind {
            FieldKind::Meta => {}
            FieldKind::Scalar => {
                payload.insert(
                    field.api_name.to_string(),
                    Value::String(value_to_string(value)),
                );
            }
            FieldKind::Bool => {
                payload.insert(
                    field.api_name.to_string(),
                    Value::String(normalize_bool(value)?.to_string()),
                );
            }
            FieldKind::Cidr => {
                let (subnet, mask) = split_cidr(&value_to_string(value))?;
                payload.insert(field.api_name.to_string(), Value::String(subnet));
                payload.insert("mask".to_string(), Value::String(mask));
            }
            FieldKind::Ref(_) => {
                let id = resolved.get(name).ok_or_else(|| {
                    Error::reference(format!(
                        "Reference field '{}' of kind '{}' was not resolved",
                        name, descriptor.kind
                    ))
                })?;
                payload.insert(field.api_name.to_string(), Value::String(id.clone()));
            }
        }
    }

    Ok(payload)
}

/// Compute the field-level diff between a desired payload and the remote
/// record
///
/// Only keys the descriptor supplied participate; fields the server holds
/// but the descriptor omits never count as drift. Boolean-encoded fields are
/// normalized on both sides before comparing.
pub fn diff(spec: &KindSpec, desired: &Fields, remote: &RemoteResource) -> Fields {
    let mut changes = Fields::new();

    for (api_name, desired_value) in desired {
        let remote_value = remote_field(spec, remote, api_name);

        let equal = match remote_value {
            None => false,
            Some(remote_value) => {
                if is_bool_field(spec, api_name) {
                    match (normalize_bool(desired_value), normalize_bool(remote_value)) {
                        (Ok(a), Ok(b)) => a == b,
                        _ => false,
                    }
                } else {
                    value_to_string(desired_value) == value_to_string(remote_value)
                }
            }
        };

        if !equal {
            changes.insert(api_name.clone(), desired_value.clone());
        }
    }

    changes
}

/// Read a remote field, following the kind's read aliases
fn remote_field<'a>(
    spec: &KindSpec,
    remote: &'a RemoteResource,
    api_name: &str,
) -> Option<&'a Value> {
    if let Some(value) = remote.field(api_name) {
        return Some(value);
    }
    spec.read_aliases
        .iter()
        .find(|(desired_name, _)| *desired_name == api_name)
        .and_then(|(_, remote_name)| remote.field(remote_name))
}

fn is_bool_field(spec: &KindSpec, api_name: &str) -> bool {
    spec.fields
        .iter()
        .any(|f| f.api_name == api_name && f.kind == FieldKind::Bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use serde_json::json;

    fn remote(fields: serde_json::Value) -> RemoteResource {
        RemoteResource {
            id: "7".to_string(),
            fields: serde_json::from_value(fields).unwrap(),
        }
    }

    #[test]
    fn truthy_allowlist() {
        for s in ["1", "true", "Yes", "ON", " yes "] {
            assert_eq!(truthy(s), Some(true), "{s}");
        }
        for s in ["0", "False", "no", "off"] {
            assert_eq!(truthy(s), Some(false), "{s}");
        }
        for s in ["2", "ja", "", "enabled"] {
            assert_eq!(truthy(s), None, "{s}");
        }
    }

    #[test]
    fn normalize_bool_accepts_literals_numbers_and_text() {
        assert_eq!(normalize_bool(&json!(true)).unwrap(), "1");
        assert_eq!(normalize_bool(&json!(0)).unwrap(), "0");
        assert_eq!(normalize_bool(&json!("Yes")).unwrap(), "1");
        assert!(normalize_bool(&json!("maybe")).is_err());
        assert!(normalize_bool(&json!(2)).is_err());
    }

    #[test]
    fn split_cidr_validates() {
        assert_eq!(
            split_cidr("10.0.0.0/24").unwrap(),
            ("10.0.0.0".to_string(), "24".to_string())
        );
        assert!(split_cidr("10.0.0.0").is_err());
        assert!(split_cidr("10.0.0.0/xx").is_err());
        assert!(split_cidr("10.0.0.0/129").is_err());
    }

    #[test]
    fn build_renames_and_normalizes() {
        let desc = Descriptor::new(ResourceKind::Section)
            .field("name", "lab")
            .field("strict_mode", "yes");
        let payload = build(&desc, &BTreeMap::new()).unwrap();
        assert_eq!(payload.get("name"), Some(&json!("lab")));
        assert_eq!(payload.get("strictMode"), Some(&json!("1")));
    }

    #[test]
    fn build_splits_cidr_and_inserts_refs() {
        let desc = Descriptor::new(ResourceKind::Subnet)
            .field("cidr", "10.20.0.0/16")
            .field("section", "lab");
        let mut resolved = BTreeMap::new();
        resolved.insert("section".to_string(), "3".to_string());
        let payload = build(&desc, &resolved).unwrap();
        assert_eq!(payload.get("subnet"), Some(&json!("10.20.0.0")));
        assert_eq!(payload.get("mask"), Some(&json!("16")));
        assert_eq!(payload.get("sectionId"), Some(&json!("3")));
    }

    #[test]
    fn build_skips_meta_fields() {
        let desc = Descriptor::new(ResourceKind::Subnet)
            .field("cidr", "10.20.0.0/16")
            .field("routing_domain", "core");
        let payload = build(&desc, &BTreeMap::new()).unwrap();
        assert!(!payload.contains_key("routing_domain"));
    }

    #[test]
    fn build_rejects_unknown_fields() {
        let desc = Descriptor::new(ResourceKind::Tag).field("colour", "red");
        assert!(matches!(
            build(&desc, &BTreeMap::new()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn diff_ignores_fields_the_descriptor_omits() {
        let spec = crate::kinds::spec(ResourceKind::Tag);
        let mut desired = Fields::new();
        desired.insert("type".to_string(), json!("backbone"));
        let remote = remote(json!({"type": "backbone", "bgcolor": "red", "locked": "0"}));
        assert!(diff(spec, &desired, &remote).is_empty());
    }

    #[test]
    fn diff_normalizes_booleans_on_both_sides() {
        let spec = crate::kinds::spec(ResourceKind::Section);
        let mut desired = Fields::new();
        desired.insert("strictMode".to_string(), json!("1"));
        // Server returns the numeric form.
        let remote = remote(json!({"strictMode": 1}));
        assert!(diff(spec, &desired, &remote).is_empty());
    }

    #[test]
    fn diff_compares_numbers_as_text() {
        let spec = crate::kinds::spec(ResourceKind::Vlan);
        let mut desired = Fields::new();
        desired.insert("number".to_string(), json!("1234"));
        let remote = remote(json!({"number": 1234, "vlanId": 9}));
        assert!(diff(spec, &desired, &remote).is_empty());
    }

    #[test]
    fn diff_reports_changed_and_missing_fields() {
        let spec = crate::kinds::spec(ResourceKind::Tag);
        let mut desired = Fields::new();
        desired.insert("bgcolor".to_string(), json!("yellow"));
        desired.insert("fgcolor".to_string(), json!("black"));
        let remote = remote(json!({"bgcolor": "red"}));
        let changes = diff(spec, &desired, &remote);
        assert_eq!(changes.get("bgcolor"), Some(&json!("yellow")));
        assert_eq!(changes.get("fgcolor"), Some(&json!("black")));
    }

    #[test]
    fn diff_follows_l2domain_permissions_alias() {
        let spec = crate::kinds::spec(ResourceKind::L2Domain);
        let mut desired = Fields::new();
        desired.insert("permissions".to_string(), json!("1;2"));
        // The server reports this field as `sections`.
        let remote = remote(json!({"name": "core", "sections": "1;2"}));
        assert!(diff(spec, &desired, &remote).is_empty());
    }
}
