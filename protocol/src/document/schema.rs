//! # Transition Base Schemas & Contract Enrichment
//!
//! A raw document transition is validated against the *contract's* schema
//! for its document type, enriched with the system properties the platform
//! adds per action:
//!
//! - every transition gets the **base** properties (`$id`,
//!   `$dataContractId`, `$type`, `$action`);
//! - a create additionally gets `$entropy` and optional
//!   `$createdAt`/`$updatedAt`;
//! - a replace additionally gets `$revision` (minimum 1) and optional
//!   `$updatedAt` — and `$createdAt` is excluded, because creation time is
//!   immutable after the fact.
//!
//! Deletes carry no user data and validate against the bare base schema.
//!
//! System binary fields travel as arrays of integers in raw form and are
//! bounded by plain `minItems`/`maxItems`. User binary fields are encoded
//! to text (base58/base64, per the contract's declaration) *before* schema
//! validation — schema engines operate on text-safe representations.

use std::collections::BTreeMap;

use base64::Engine;
use serde_json::{json, Map, Value};

use crate::data_contract::{ContentEncoding, DataContract};
use crate::document::transition::Action;
use crate::validation::value_to_bytes;

// ---------------------------------------------------------------------------
// Base schemas
// ---------------------------------------------------------------------------

/// Schema for a 32-byte system field in raw (integer-array) form.
fn byte_array_schema(min_items: usize, max_items: usize) -> Value {
    json!({
        "type": "array",
        "items": { "type": "integer", "minimum": 0, "maximum": 255 },
        "minItems": min_items,
        "maxItems": max_items
    })
}

/// The envelope schema for a whole documents-batch transition.
///
/// Checked before anything else; a failure here aborts validation without
/// a single contract fetch.
pub fn documents_batch_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "protocolVersion": { "type": "integer", "minimum": 0 },
            "type": { "type": "integer", "const": 1 },
            "ownerId": byte_array_schema(32, 32),
            "transitions": {
                "type": "array",
                "items": { "type": "object" },
                "minItems": 1,
                "maxItems": 10
            },
            "signature": byte_array_schema(64, 64),
            "signaturePublicKeyId": { "type": "integer", "minimum": 0 }
        },
        "required": [
            "protocolVersion",
            "type",
            "ownerId",
            "transitions",
            "signature",
            "signaturePublicKeyId"
        ],
        "additionalProperties": false
    })
}

/// System properties common to every transition.
pub fn base_transition_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "$id": byte_array_schema(32, 32),
            "$dataContractId": byte_array_schema(32, 32),
            "$type": { "type": "string" },
            "$action": { "type": "integer", "enum": [0, 1, 3] }
        },
        "required": ["$id", "$dataContractId", "$type", "$action"],
        "additionalProperties": false
    })
}

/// Extra system properties of a create transition.
///
/// `$entropy` is bounded only loosely here; exact length is enforced by
/// the validator's dedicated entropy check so that a wrong-sized entropy
/// surfaces as an entropy error, not a generic schema violation.
fn create_extension() -> Value {
    json!({
        "properties": {
            "$entropy": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0, "maximum": 255 }
            },
            "$createdAt": { "type": "integer", "minimum": 0 },
            "$updatedAt": { "type": "integer", "minimum": 0 }
        },
        "required": ["$entropy"]
    })
}

/// Extra system properties of a replace transition.
fn replace_extension() -> Value {
    json!({
        "properties": {
            "$revision": { "type": "integer", "minimum": 1 },
            "$updatedAt": { "type": "integer", "minimum": 0 }
        },
        "required": ["$revision"]
    })
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Build the full validation schema for one (document type, action) pair.
///
/// Starts from the contract's declared schema for the type, merges in the
/// base system properties and the action extension, and pins
/// `additionalProperties: false` so stray fields are rejected. For
/// replace, `$createdAt` is excluded even if the contract requires it on
/// the document.
///
/// Returns `None` when the contract does not declare the document type —
/// the validator reports that as its own consensus error before ever
/// asking for a schema.
pub fn enriched_schema(
    contract: &DataContract,
    document_type: &str,
    action: Action,
) -> Option<Value> {
    let declared = contract.document_schema(document_type)?;

    let mut properties: Map<String, Value> = declared
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let mut required: Vec<String> = declared
        .get("required")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let mut merge = |extension: &Value| {
        if let Some(props) = extension.get("properties").and_then(Value::as_object) {
            for (k, v) in props {
                properties.insert(k.clone(), v.clone());
            }
        }
        if let Some(req) = extension.get("required").and_then(Value::as_array) {
            for field in req.iter().filter_map(Value::as_str) {
                if !required.iter().any(|r| r == field) {
                    required.push(field.to_string());
                }
            }
        }
    };

    merge(&base_transition_schema());
    match action {
        Action::Create => merge(&create_extension()),
        Action::Replace => merge(&replace_extension()),
        Action::Delete => {}
    }

    if action == Action::Replace {
        properties.remove("$createdAt");
        required.retain(|r| r != "$createdAt");
    }

    Some(json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    }))
}

// ---------------------------------------------------------------------------
// Binary content encoding
// ---------------------------------------------------------------------------

/// Encode the contract-declared binary properties of a raw transition to
/// their text forms, returning the encoded copy.
///
/// Fields whose raw value is not an integer array are left untouched — the
/// schema will flag them with a type violation, which is a better error
/// than anything we could synthesize here.
pub fn encode_binary_properties(
    raw: &Value,
    binary_properties: &BTreeMap<String, ContentEncoding>,
) -> Value {
    let mut encoded = raw.clone();
    for (path, encoding) in binary_properties {
        if let Some(slot) = lookup_path_mut(&mut encoded, path) {
            if let Some(bytes) = value_to_bytes(Some(slot)) {
                *slot = match encoding {
                    ContentEncoding::Base58 => {
                        Value::from(bs58::encode(&bytes).into_string())
                    }
                    ContentEncoding::Base64 => Value::from(
                        base64::engine::general_purpose::STANDARD.encode(&bytes),
                    ),
                };
            }
        }
    }
    encoded
}

/// Walk a dot-separated property path into a JSON object tree.
fn lookup_path_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;

    fn contract() -> DataContract {
        let mut documents = BTreeMap::new();
        documents.insert(
            "note".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "label": { "type": "string" },
                    "attachment": { "type": "string", "contentEncoding": "base64" }
                },
                "required": ["label"],
                "additionalProperties": false
            }),
        );
        DataContract::new(
            Identifier::new([1u8; 32]),
            Identifier::new([2u8; 32]),
            1,
            documents,
        )
    }

    fn compiled(schema: &Value) -> jsonschema::JSONSchema {
        jsonschema::JSONSchema::compile(schema).expect("schema compiles")
    }

    fn valid_create_raw() -> Value {
        json!({
            "$id": vec![3u8; 32],
            "$dataContractId": vec![1u8; 32],
            "$type": "note",
            "$action": 0,
            "$entropy": vec![9u8; 32],
            "label": "hello"
        })
    }

    #[test]
    fn envelope_schema_bounds_transitions() {
        let schema = documents_batch_schema();
        let validator = compiled(&schema);

        let empty = json!({
            "protocolVersion": 1,
            "type": 1,
            "ownerId": vec![2u8; 32],
            "transitions": [],
            "signature": vec![0u8; 64],
            "signaturePublicKeyId": 0
        });
        assert!(validator.validate(&empty).is_err());

        let eleven = json!({
            "protocolVersion": 1,
            "type": 1,
            "ownerId": vec![2u8; 32],
            "transitions": (0..11).map(|_| json!({})).collect::<Vec<_>>(),
            "signature": vec![0u8; 64],
            "signaturePublicKeyId": 0
        });
        assert!(validator.validate(&eleven).is_err());
    }

    #[test]
    fn enriched_create_schema_accepts_valid_transition() {
        let schema = enriched_schema(&contract(), "note", Action::Create).unwrap();
        let validator = compiled(&schema);
        assert!(validator.validate(&valid_create_raw()).is_ok());
    }

    #[test]
    fn enriched_create_schema_rejects_stray_fields() {
        let schema = enriched_schema(&contract(), "note", Action::Create).unwrap();
        let validator = compiled(&schema);

        let mut raw = valid_create_raw();
        raw["smuggled"] = json!(true);
        assert!(validator.validate(&raw).is_err());
    }

    #[test]
    fn replace_schema_requires_revision_at_least_one() {
        let schema = enriched_schema(&contract(), "note", Action::Replace).unwrap();
        let validator = compiled(&schema);

        let raw = json!({
            "$id": vec![3u8; 32],
            "$dataContractId": vec![1u8; 32],
            "$type": "note",
            "$action": 1,
            "$revision": 0,
            "label": "hello"
        });
        let errors: Vec<String> = validator
            .validate(&raw)
            .unwrap_err()
            .map(|e| e.schema_path.to_string())
            .collect();
        assert!(errors.iter().any(|p| p.ends_with("minimum")), "{errors:?}");
    }

    #[test]
    fn replace_schema_excludes_created_at() {
        let schema = enriched_schema(&contract(), "note", Action::Replace).unwrap();
        assert!(schema["properties"].get("$createdAt").is_none());
        assert!(schema["properties"].get("$revision").is_some());
    }

    #[test]
    fn delete_validates_against_bare_base_schema() {
        let schema = base_transition_schema();
        let validator = compiled(&schema);

        let raw = json!({
            "$id": vec![3u8; 32],
            "$dataContractId": vec![1u8; 32],
            "$type": "note",
            "$action": 3
        });
        assert!(validator.validate(&raw).is_ok());
    }

    #[test]
    fn unknown_document_type_yields_no_schema() {
        assert!(enriched_schema(&contract(), "invoice", Action::Create).is_none());
    }

    #[test]
    fn binary_properties_are_encoded_before_validation() {
        let contract = contract();
        let binary = contract.binary_properties("note");

        let mut raw = valid_create_raw();
        raw["attachment"] = json!(vec![0xDEu8, 0xAD, 0xBE, 0xEF]);

        let encoded = encode_binary_properties(&raw, &binary);
        assert_eq!(encoded["attachment"], json!("3q2+7w=="));

        // And the encoded form passes the enriched schema (string type).
        let schema = enriched_schema(&contract, "note", Action::Create).unwrap();
        assert!(compiled(&schema).validate(&encoded).is_ok());
    }

    #[test]
    fn non_array_binary_field_left_untouched() {
        let contract = contract();
        let binary = contract.binary_properties("note");

        let mut raw = valid_create_raw();
        raw["attachment"] = json!(42);
        let encoded = encode_binary_properties(&raw, &binary);
        assert_eq!(encoded["attachment"], json!(42));
    }
}
