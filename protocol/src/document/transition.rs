//! # Document Transitions & the Batch Envelope
//!
//! A [`DocumentTransition`] is one Create/Replace/Delete mutation to one
//! document. A [`DocumentsBatchTransition`] is the signed envelope a client
//! actually submits: an owner, 1..=10 transitions, and a signature over the
//! canonical bytes.
//!
//! The transition is a single tagged enum with a shared
//! [`DocumentBaseTransition`] and per-variant payloads. Dispatch is a
//! `match` on the tag — there is no class hierarchy here, virtual or
//! otherwise.
//!
//! ## Raw form
//!
//! Validation operates on the *raw* JSON form, where system properties are
//! `$`-prefixed (`$id`, `$type`, `$action`, `$dataContractId`, `$entropy`,
//! `$revision`, `$createdAt`, `$updatedAt`) and user data fields sit beside
//! them at the top level. System binary fields are arrays of integers in
//! raw form; user binary fields stay as the caller provided them until the
//! validator applies the contract's content encoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{DOCUMENTS_BATCH_TRANSITION_TYPE, PROTOCOL_VERSION};
use crate::identifier::Identifier;
use crate::validation::{bytes_to_value, value_to_bytes};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Discriminant for what a document transition does.
///
/// The numeric codes are wire-stable: `2` is reserved and `Delete` is `3`
/// for historical reasons, so a plain `as u8` cast would be wrong —
/// always go through [`Action::code`] / [`Action::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Bring a new document into existence.
    Create,
    /// Overwrite an existing document with a new revision.
    Replace,
    /// Remove an existing document.
    Delete,
}

impl Action {
    /// The wire code for this action.
    pub const fn code(self) -> u64 {
        match self {
            Self::Create => 0,
            Self::Replace => 1,
            Self::Delete => 3,
        }
    }

    /// Parse a wire code. Returns `None` for unknown or reserved codes.
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Create),
            1 => Some(Self::Replace),
            3 => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors converting between typed transitions/batches and their raw or
/// wire forms.
///
/// These are *caller* errors (you handed us a malformed value), distinct
/// from consensus errors (the network would reject this) — the validator
/// produces the latter.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// A required field is absent from the raw object.
    #[error("required field '{field}' is missing")]
    MissingField {
        /// The `$`-prefixed (or envelope) field name.
        field: &'static str,
    },

    /// A field is present but has the wrong shape.
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The offending field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// `$action` carries a code outside the known set.
    #[error("unknown action code {action}")]
    UnknownAction {
        /// The raw code found.
        action: u64,
    },

    /// Wire envelope encode/decode failure.
    #[error("wire envelope error: {0}")]
    Wire(String),
}

// ---------------------------------------------------------------------------
// Transition variants
// ---------------------------------------------------------------------------

/// Fields common to every document transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBaseTransition {
    /// Document id. For creates, derived from
    /// (contract, owner, type, entropy); for replace/delete, the id of the
    /// existing document.
    pub id: Identifier,

    /// The data contract declaring this document's type.
    pub data_contract_id: Identifier,

    /// Document type name within the contract.
    pub document_type: String,
}

/// Create a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCreateTransition {
    /// Common fields.
    pub base: DocumentBaseTransition,

    /// 32 bytes of caller-generated entropy; the document id commits to it.
    pub entropy: [u8; 32],

    /// Creation timestamp in Unix milliseconds, when the type requires it.
    pub created_at: Option<u64>,

    /// Update timestamp in Unix milliseconds, when the type requires it.
    pub updated_at: Option<u64>,

    /// User data fields. Sorted map, so canonical serialization is
    /// deterministic.
    pub data: Map<String, Value>,
}

/// Replace an existing document with a new revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReplaceTransition {
    /// Common fields.
    pub base: DocumentBaseTransition,

    /// Revision being written. Starts at 1; must exceed the stored revision.
    pub revision: u64,

    /// Update timestamp in Unix milliseconds, when the type requires it.
    pub updated_at: Option<u64>,

    /// User data fields.
    pub data: Map<String, Value>,
}

/// Delete an existing document. Carries only the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDeleteTransition {
    /// Common fields.
    pub base: DocumentBaseTransition,
}

/// One document mutation, tagged by action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentTransition {
    /// Create a new document.
    Create(DocumentCreateTransition),
    /// Replace an existing document.
    Replace(DocumentReplaceTransition),
    /// Delete an existing document.
    Delete(DocumentDeleteTransition),
}

impl DocumentTransition {
    /// The common fields, regardless of variant.
    pub fn base(&self) -> &DocumentBaseTransition {
        match self {
            Self::Create(t) => &t.base,
            Self::Replace(t) => &t.base,
            Self::Delete(t) => &t.base,
        }
    }

    /// The action tag.
    pub fn action(&self) -> Action {
        match self {
            Self::Create(_) => Action::Create,
            Self::Replace(_) => Action::Replace,
            Self::Delete(_) => Action::Delete,
        }
    }

    /// The user data map, for variants that carry one.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Create(t) => Some(&t.data),
            Self::Replace(t) => Some(&t.data),
            Self::Delete(_) => None,
        }
    }

    /// Render the raw `$`-prefixed JSON object.
    pub fn to_raw_object(&self) -> Value {
        let mut obj = Map::new();
        let base = self.base();
        obj.insert("$id".into(), bytes_to_value(base.id.as_bytes()));
        obj.insert(
            "$dataContractId".into(),
            bytes_to_value(base.data_contract_id.as_bytes()),
        );
        obj.insert("$type".into(), Value::from(base.document_type.clone()));
        obj.insert("$action".into(), Value::from(self.action().code()));

        match self {
            Self::Create(t) => {
                obj.insert("$entropy".into(), bytes_to_value(&t.entropy));
                if let Some(created_at) = t.created_at {
                    obj.insert("$createdAt".into(), Value::from(created_at));
                }
                if let Some(updated_at) = t.updated_at {
                    obj.insert("$updatedAt".into(), Value::from(updated_at));
                }
                for (k, v) in &t.data {
                    obj.insert(k.clone(), v.clone());
                }
            }
            Self::Replace(t) => {
                obj.insert("$revision".into(), Value::from(t.revision));
                if let Some(updated_at) = t.updated_at {
                    obj.insert("$updatedAt".into(), Value::from(updated_at));
                }
                for (k, v) in &t.data {
                    obj.insert(k.clone(), v.clone());
                }
            }
            Self::Delete(_) => {}
        }

        Value::Object(obj)
    }

    /// Parse a raw `$`-prefixed JSON object into a typed transition.
    pub fn from_raw_object(raw: &Value) -> Result<Self, TransitionError> {
        let obj = raw.as_object().ok_or(TransitionError::InvalidField {
            field: "transition",
            reason: "not an object".into(),
        })?;

        let base = DocumentBaseTransition {
            id: raw_identifier(obj, "$id")?,
            data_contract_id: raw_identifier(obj, "$dataContractId")?,
            document_type: obj
                .get("$type")
                .ok_or(TransitionError::MissingField { field: "$type" })?
                .as_str()
                .ok_or(TransitionError::InvalidField {
                    field: "$type",
                    reason: "not a string".into(),
                })?
                .to_string(),
        };

        let action_code = obj
            .get("$action")
            .ok_or(TransitionError::MissingField { field: "$action" })?
            .as_u64()
            .ok_or(TransitionError::InvalidField {
                field: "$action",
                reason: "not an integer".into(),
            })?;
        let action = Action::from_code(action_code)
            .ok_or(TransitionError::UnknownAction { action: action_code })?;

        let data: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match action {
            Action::Create => {
                let entropy_bytes = value_to_bytes(obj.get("$entropy")).ok_or(
                    TransitionError::MissingField {
                        field: "$entropy",
                    },
                )?;
                let entropy: [u8; 32] = entropy_bytes.as_slice().try_into().map_err(|_| {
                    TransitionError::InvalidField {
                        field: "$entropy",
                        reason: format!("expected 32 bytes, got {}", entropy_bytes.len()),
                    }
                })?;
                Ok(Self::Create(DocumentCreateTransition {
                    base,
                    entropy,
                    created_at: obj.get("$createdAt").and_then(Value::as_u64),
                    updated_at: obj.get("$updatedAt").and_then(Value::as_u64),
                    data,
                }))
            }
            Action::Replace => Ok(Self::Replace(DocumentReplaceTransition {
                base,
                revision: obj
                    .get("$revision")
                    .ok_or(TransitionError::MissingField { field: "$revision" })?
                    .as_u64()
                    .ok_or(TransitionError::InvalidField {
                        field: "$revision",
                        reason: "not an unsigned integer".into(),
                    })?,
                updated_at: obj.get("$updatedAt").and_then(Value::as_u64),
                data,
            })),
            Action::Delete => Ok(Self::Delete(DocumentDeleteTransition { base })),
        }
    }
}

fn raw_identifier(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Identifier, TransitionError> {
    let bytes = value_to_bytes(obj.get(field)).ok_or(TransitionError::MissingField { field })?;
    Identifier::from_bytes(&bytes).map_err(|e| TransitionError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// DocumentsBatchTransition
// ---------------------------------------------------------------------------

/// The signed envelope a client submits: owner, transitions, signature.
///
/// The `id` of the signing key and the signature are set after
/// construction via [`DocumentsBatchTransition::set_signature`]; the
/// canonical bytes being signed ([`signable_bytes`]) exclude both, so the
/// payload is stable across signing.
///
/// [`signable_bytes`]: DocumentsBatchTransition::signable_bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsBatchTransition {
    /// Protocol version at construction time.
    pub protocol_version: u32,

    /// Wire type discriminator; always
    /// [`DOCUMENTS_BATCH_TRANSITION_TYPE`] for this envelope.
    pub transition_type: u8,

    /// The identity that owns every document in the batch and signs the
    /// envelope.
    pub owner_id: Identifier,

    /// The mutations, 1..=10 of them.
    pub transitions: Vec<DocumentTransition>,

    /// Ed25519 signature over [`Self::signable_bytes`]. Empty until signed.
    pub signature: Vec<u8>,

    /// Id of the identity public key that produced the signature.
    pub signature_public_key_id: u64,
}

impl DocumentsBatchTransition {
    /// Assemble an unsigned batch at the current protocol version.
    pub fn new(owner_id: Identifier, transitions: Vec<DocumentTransition>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            transition_type: DOCUMENTS_BATCH_TRANSITION_TYPE,
            owner_id,
            transitions,
            signature: Vec::new(),
            signature_public_key_id: 0,
        }
    }

    /// Attach a signature and the id of the key that produced it.
    pub fn set_signature(&mut self, signature: Vec<u8>, public_key_id: u64) {
        self.signature = signature;
        self.signature_public_key_id = public_key_id;
    }

    /// Render the raw JSON envelope the validator consumes.
    pub fn to_raw_object(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "protocolVersion".into(),
            Value::from(self.protocol_version),
        );
        obj.insert("type".into(), Value::from(self.transition_type));
        obj.insert("ownerId".into(), bytes_to_value(self.owner_id.as_bytes()));
        obj.insert(
            "transitions".into(),
            Value::Array(
                self.transitions
                    .iter()
                    .map(DocumentTransition::to_raw_object)
                    .collect(),
            ),
        );
        obj.insert("signature".into(), bytes_to_value(&self.signature));
        obj.insert(
            "signaturePublicKeyId".into(),
            Value::from(self.signature_public_key_id),
        );
        Value::Object(obj)
    }

    /// Parse a raw JSON envelope back into a typed batch.
    pub fn from_raw_object(raw: &Value) -> Result<Self, TransitionError> {
        let obj = raw.as_object().ok_or(TransitionError::InvalidField {
            field: "stateTransition",
            reason: "not an object".into(),
        })?;

        let protocol_version = obj
            .get("protocolVersion")
            .ok_or(TransitionError::MissingField {
                field: "protocolVersion",
            })?
            .as_u64()
            .ok_or(TransitionError::InvalidField {
                field: "protocolVersion",
                reason: "not an unsigned integer".into(),
            })? as u32;

        let transition_type = obj
            .get("type")
            .ok_or(TransitionError::MissingField { field: "type" })?
            .as_u64()
            .ok_or(TransitionError::InvalidField {
                field: "type",
                reason: "not an unsigned integer".into(),
            })? as u8;

        let owner_id = raw_identifier(obj, "ownerId")?;

        let transitions = obj
            .get("transitions")
            .ok_or(TransitionError::MissingField {
                field: "transitions",
            })?
            .as_array()
            .ok_or(TransitionError::InvalidField {
                field: "transitions",
                reason: "not an array".into(),
            })?
            .iter()
            .map(DocumentTransition::from_raw_object)
            .collect::<Result<Vec<_>, _>>()?;

        let signature =
            value_to_bytes(obj.get("signature")).ok_or(TransitionError::MissingField {
                field: "signature",
            })?;

        let signature_public_key_id = obj
            .get("signaturePublicKeyId")
            .ok_or(TransitionError::MissingField {
                field: "signaturePublicKeyId",
            })?
            .as_u64()
            .ok_or(TransitionError::InvalidField {
                field: "signaturePublicKeyId",
                reason: "not an unsigned integer".into(),
            })?;

        Ok(Self {
            protocol_version,
            transition_type,
            owner_id,
            transitions,
            signature,
            signature_public_key_id,
        })
    }

    /// Canonical bytes for signing and signature verification.
    ///
    /// Deterministic concatenation: version (LE), type discriminator,
    /// owner bytes, then each transition's canonical JSON bytes separated
    /// by a null byte. The raw JSON is deterministic because data maps are
    /// sorted. `signature` and `signaturePublicKeyId` are excluded, so the
    /// bytes are stable across signing.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.protocol_version.to_le_bytes());
        buf.push(self.transition_type);
        buf.extend_from_slice(self.owner_id.as_bytes());
        for transition in &self.transitions {
            let raw = transition.to_raw_object();
            // Sorted-map serialization; infallible for values we built.
            buf.extend_from_slice(
                serde_json::to_vec(&raw).expect("raw transition serializes").as_slice(),
            );
            buf.push(0x00);
        }
        buf
    }

    /// Encode the versioned binary wire envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransitionError> {
        let envelope = WireEnvelope {
            protocol_version: self.protocol_version,
            transition_type: self.transition_type,
            owner_id: self.owner_id.to_buffer(),
            transitions: self
                .transitions
                .iter()
                .map(|t| serde_json::to_vec(&t.to_raw_object()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TransitionError::Wire(e.to_string()))?,
            signature: self.signature.clone(),
            signature_public_key_id: self.signature_public_key_id,
        };
        bincode::serialize(&envelope).map_err(|e| TransitionError::Wire(e.to_string()))
    }

    /// Decode a wire envelope produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransitionError> {
        let envelope: WireEnvelope =
            bincode::deserialize(bytes).map_err(|e| TransitionError::Wire(e.to_string()))?;

        let transitions = envelope
            .transitions
            .iter()
            .map(|raw| {
                let value: Value = serde_json::from_slice(raw)
                    .map_err(|e| TransitionError::Wire(e.to_string()))?;
                DocumentTransition::from_raw_object(&value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            protocol_version: envelope.protocol_version,
            transition_type: envelope.transition_type,
            owner_id: Identifier::new(envelope.owner_id),
            transitions,
            signature: envelope.signature,
            signature_public_key_id: envelope.signature_public_key_id,
        })
    }
}

/// On-the-wire shape. Transitions travel as canonical JSON bytes inside the
/// bincode frame; the self-describing inner encoding keeps user data maps
/// (whose keys are unknowable at compile time) round-trippable.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    protocol_version: u32,
    transition_type: u8,
    owner_id: [u8; 32],
    transitions: Vec<Vec<u8>>,
    signature: Vec<u8>,
    signature_public_key_id: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
