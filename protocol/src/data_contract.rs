//! # Data Contracts — Consumer-Side Model
//!
//! A data contract is the schema authority for documents: it declares which
//! document types exist, what their fields look like, which field
//! combinations must be unique, and how binary fields are encoded in text
//! form. The contract *language* is owned by the platform; this module is
//! only the client's read-side view — enough structure to enrich schemas,
//! evaluate unique indices, and encode binary properties during batch
//! validation.
//!
//! Contracts arrive from the network as JSON. Document-type schemas are kept
//! as raw [`serde_json::Value`]s and interrogated on demand; we do not
//! re-model the whole schema language here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifier::Identifier;

// ---------------------------------------------------------------------------
// ContentEncoding
// ---------------------------------------------------------------------------

/// Text encoding a contract declares for a binary document property.
///
/// Schema validators operate on text-safe representations, so byte-valued
/// fields are encoded to strings before validation. Identifier-typed fields
/// use base58 (matching [`Identifier`]'s canonical form); general byte
/// fields use base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    /// Identifier-typed field: 32 bytes, base58 text form.
    Base58,
    /// Arbitrary byte field: standard base64 with padding.
    Base64,
}

// ---------------------------------------------------------------------------
// IndexDefinition
// ---------------------------------------------------------------------------

/// One index a contract declares over a document type.
///
/// Only `unique` indices participate in batch validation (two transitions
/// in one batch must not collide on all indexed property values); the rest
/// are query hints for the platform and ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name, unique within the document type.
    pub name: String,

    /// Indexed property names, in declaration order.
    pub properties: Vec<String>,

    /// Whether the platform enforces uniqueness over this combination.
    #[serde(default)]
    pub unique: bool,
}

// ---------------------------------------------------------------------------
// DataContract
// ---------------------------------------------------------------------------

/// A data contract as consumed by the client protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContract {
    /// Content identifier of the contract.
    pub id: Identifier,

    /// Identity that registered (and may update) the contract.
    pub owner_id: Identifier,

    /// Contract version, bumped on every contract update.
    pub version: u32,

    /// Document-type name → JSON schema for that type. The schema may carry
    /// an `indices` array (platform extension keyword; ignored by schema
    /// engines) describing declared indices.
    pub documents: BTreeMap<String, Value>,
}

impl DataContract {
    /// Create a contract view from its parts.
    pub fn new(
        id: Identifier,
        owner_id: Identifier,
        version: u32,
        documents: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            owner_id,
            version,
            documents,
        }
    }

    /// Whether the contract declares the given document type.
    pub fn is_document_defined(&self, document_type: &str) -> bool {
        self.documents.contains_key(document_type)
    }

    /// The declared schema for a document type, if any.
    pub fn document_schema(&self, document_type: &str) -> Option<&Value> {
        self.documents.get(document_type)
    }

    /// All declared document type names.
    pub fn document_types(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Parse the index definitions a document type declares.
    ///
    /// Malformed index entries are skipped rather than rejected: the
    /// platform already validated the contract at registration time, so a
    /// shape we cannot read is a platform-version skew, not a user error.
    pub fn indices(&self, document_type: &str) -> Vec<IndexDefinition> {
        let Some(entries) = self
            .document_schema(document_type)
            .and_then(|s| s.get("indices"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?.to_string();
                let unique = entry
                    .get("unique")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                // Properties come as [{"field": "asc"}, ...]; the sort
                // direction is irrelevant for uniqueness.
                let properties = entry
                    .get("properties")?
                    .as_array()?
                    .iter()
                    .filter_map(|p| p.as_object()?.keys().next().cloned())
                    .collect::<Vec<_>>();
                Some(IndexDefinition {
                    name,
                    properties,
                    unique,
                })
            })
            .collect()
    }

    /// Only the unique indices of a document type.
    pub fn unique_indices(&self, document_type: &str) -> Vec<IndexDefinition> {
        self.indices(document_type)
            .into_iter()
            .filter(|i| i.unique)
            .collect()
    }

    /// Collect the binary properties a document type declares, as a map
    /// from (dot-separated, possibly nested) property path to the declared
    /// content encoding.
    pub fn binary_properties(&self, document_type: &str) -> BTreeMap<String, ContentEncoding> {
        let mut out = BTreeMap::new();
        if let Some(props) = self
            .document_schema(document_type)
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_object)
        {
            collect_binary_properties(props, "", &mut out);
        }
        out
    }
}

/// Recursive walk over schema `properties`, recording every property that
/// declares a `contentEncoding`.
fn collect_binary_properties(
    properties: &serde_json::Map<String, Value>,
    prefix: &str,
    out: &mut BTreeMap<String, ContentEncoding>,
) {
    for (name, schema) in properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        match schema.get("contentEncoding").and_then(Value::as_str) {
            Some("base58") => {
                out.insert(path, ContentEncoding::Base58);
            }
            Some("base64") => {
                out.insert(path, ContentEncoding::Base64);
            }
            _ => {
                // Not binary itself; descend into nested object schemas.
                if let Some(nested) = schema.get("properties").and_then(Value::as_object) {
                    collect_binary_properties(nested, &path, out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
