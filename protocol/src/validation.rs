//! # Validation Results & Consensus Errors
//!
//! Validation on Meridian is *aggregating*: a batch with three independent
//! problems reports all three in one pass, because making users fix errors
//! one resubmission at a time is hostile. [`ValidationResult`] is the
//! accumulator; [`ConsensusError`] is the vocabulary.
//!
//! Every consensus error carries a **stable numeric code**. The codes are
//! part of the protocol: node-side validation produces the same codes for
//! the same violations, so a client can pre-validate locally and trust that
//! "valid here" means "valid there". Callers branch on the error kind or
//! code, never on the message text — messages are for humans and may change.

use serde_json::Value;
use thiserror::Error;

use crate::identifier::Identifier;

// ---------------------------------------------------------------------------
// ConsensusError
// ---------------------------------------------------------------------------

/// A structured, code-bearing validation failure.
///
/// Codes in the 1xxx range are *basic* (structural) errors detectable from
/// the transition alone plus fetched contracts; codes in the 2xxx range are
/// *signature/identity* errors that require platform state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    /// The envelope's protocol version is outside the supported range.
    #[error("protocol version {version} is out of the supported range [{minimum}, {maximum}]")]
    UnsupportedProtocolVersion {
        /// Version found in the envelope.
        version: u32,
        /// Lowest version this client supports.
        minimum: u32,
        /// Highest version this client supports.
        maximum: u32,
    },

    /// A JSON-Schema-level violation, carrying the offending paths.
    #[error("schema violation at '{instance_path}': {message}")]
    JsonSchemaViolation {
        /// JSON pointer into the validated instance.
        instance_path: String,
        /// JSON pointer into the schema that failed.
        schema_path: String,
        /// The failing schema keyword ("required", "minItems", "minimum", ...).
        keyword: String,
        /// Human-readable description from the schema engine.
        message: String,
    },

    /// An identifier-typed field could not be parsed as 32 bytes.
    #[error("invalid identifier '{identifier_name}': {reason}")]
    InvalidIdentifier {
        /// Name of the offending field (e.g. `$dataContractId`).
        identifier_name: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The referenced data contract does not exist on the platform.
    #[error("data contract {data_contract_id} is not present")]
    DataContractNotPresent {
        /// The contract id that failed to resolve.
        data_contract_id: Identifier,
    },

    /// Two or more transitions in the batch collide, either on `(type, id)`
    /// or on a contract-declared unique index combination.
    #[error("duplicate document transitions: {} colliding transitions", .references.len())]
    DuplicateDocumentTransitions {
        /// `(document_type, document_id)` of every offending transition.
        references: Vec<(String, Identifier)>,
    },

    /// `$action` is present but not one of Create/Replace/Delete.
    #[error("document transition action '{action}' is not valid")]
    InvalidDocumentTransitionAction {
        /// The raw action value as found.
        action: String,
    },

    /// A create transition's `$id` does not match the derived id.
    #[error("invalid document transition id: expected {expected_id}, got {invalid_id}")]
    InvalidDocumentTransitionId {
        /// Id recomputed from (contract, owner, type, entropy).
        expected_id: Identifier,
        /// Id claimed by the transition.
        invalid_id: Identifier,
    },

    /// A create transition's `$entropy` is malformed.
    #[error("invalid document transition entropy: {reason}")]
    InvalidDocumentTransitionEntropy {
        /// Why the entropy was rejected.
        reason: String,
    },

    /// `$type` names a document type the contract does not declare.
    #[error("document type '{document_type}' is not defined in contract {data_contract_id}")]
    InvalidDocumentType {
        /// The undeclared type name.
        document_type: String,
        /// The contract that was consulted.
        data_contract_id: Identifier,
    },

    /// A transition has no `$dataContractId` field.
    #[error("$dataContractId is missing")]
    MissingDataContractId,

    /// A transition has no `$action` field.
    #[error("$action is missing")]
    MissingDocumentTransitionAction,

    /// A transition has no `$type` field.
    #[error("$type is missing")]
    MissingDocumentType,

    /// The signing identity does not exist on the platform.
    #[error("identity {identity_id} not found")]
    IdentityNotFound {
        /// The owner id that failed to resolve.
        identity_id: Identifier,
    },

    /// The batch signature does not verify against the identified key.
    #[error("invalid state transition signature")]
    InvalidStateTransitionSignature,

    /// `signaturePublicKeyId` names a key the identity does not have.
    #[error("public key {public_key_id} not found on the signing identity")]
    MissingPublicKey {
        /// The key id that was requested.
        public_key_id: u64,
    },
}

impl ConsensusError {
    /// The stable numeric code for this error. Part of the protocol.
    pub fn code(&self) -> u32 {
        match self {
            Self::UnsupportedProtocolVersion { .. } => 1002,
            Self::JsonSchemaViolation { .. } => 1005,
            Self::InvalidIdentifier { .. } => 1006,
            Self::DataContractNotPresent { .. } => 1018,
            Self::DuplicateDocumentTransitions { .. } => 1019,
            Self::InvalidDocumentTransitionAction { .. } => 1022,
            Self::InvalidDocumentTransitionId { .. } => 1023,
            Self::InvalidDocumentType { .. } => 1024,
            Self::MissingDataContractId => 1025,
            Self::MissingDocumentTransitionAction => 1026,
            Self::MissingDocumentType => 1027,
            Self::InvalidDocumentTransitionEntropy { .. } => 1040,
            Self::IdentityNotFound { .. } => 2000,
            Self::InvalidStateTransitionSignature => 2002,
            Self::MissingPublicKey { .. } => 2004,
        }
    }

    /// The data contract id this error refers to, when it carries one.
    pub fn data_contract_id(&self) -> Option<&Identifier> {
        match self {
            Self::DataContractNotPresent { data_contract_id }
            | Self::InvalidDocumentType {
                data_contract_id, ..
            } => Some(data_contract_id),
            _ => None,
        }
    }

    /// The failing schema keyword, for schema violations.
    pub fn schema_keyword(&self) -> Option<&str> {
        match self {
            Self::JsonSchemaViolation { keyword, .. } => Some(keyword),
            _ => None,
        }
    }

    /// The instance path of a schema violation.
    pub fn instance_path(&self) -> Option<&str> {
        match self {
            Self::JsonSchemaViolation { instance_path, .. } => Some(instance_path),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Accumulator for consensus errors across one validation pass.
///
/// Empty means valid. Errors from unrelated transitions/groups are all
/// collected; the validator decides where short-circuits apply (see
/// [`crate::document::validator`]).
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    errors: Vec<ConsensusError>,
}

impl ValidationResult {
    /// A fresh, valid (empty) result.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors have been recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record one error.
    pub fn add_error(&mut self, error: ConsensusError) {
        self.errors.push(error);
    }

    /// Absorb every error from another result, preserving order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    /// All recorded errors, in the order they were found.
    pub fn errors(&self) -> &[ConsensusError] {
        &self.errors
    }

    /// The first recorded error, if any. Convenient for tests and for
    /// callers that only want to know *why* a batch failed.
    pub fn first_error(&self) -> Option<&ConsensusError> {
        self.errors.first()
    }

    /// Errors filtered down to schema violations.
    pub fn schema_errors(&self) -> Vec<&ConsensusError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, ConsensusError::JsonSchemaViolation { .. }))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Raw-value helpers
// ---------------------------------------------------------------------------

/// Extract a byte vector from a raw JSON value holding an array of integers.
///
/// Raw transitions carry system binary fields (`$id`, `$entropy`,
/// `ownerId`, `signature`) as arrays of numbers 0..=255. Returns `None`
/// when the value is absent, not an array, or contains non-byte entries —
/// the caller maps that to the appropriate consensus error.
pub fn value_to_bytes(value: Option<&Value>) -> Option<Vec<u8>> {
    let array = value?.as_array()?;
    array
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|n| if n <= 255 { Some(n as u8) } else { None })
        })
        .collect()
}

/// Render a byte slice as a raw JSON array of integers.
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
