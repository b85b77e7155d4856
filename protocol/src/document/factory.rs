//! # Document Factory — Transition Construction
//!
//! The convenience layer callers actually use: hand it a contract, an
//! owner, and plain data, and it produces well-formed transitions — fresh
//! entropy, derived ids, timestamps where the document type requires them —
//! and assembles them into an unsigned [`DocumentsBatchTransition`].
//!
//! Everything the factory produces passes the batch validator by
//! construction (assuming the data itself conforms to the contract); the
//! factory exists so callers cannot get the derivation or the bounds wrong
//! by hand-rolling raw objects.

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{INITIAL_REVISION, MAX_BATCH_TRANSITIONS, MIN_BATCH_TRANSITIONS};
use crate::crypto::generate_entropy;
use crate::data_contract::DataContract;
use crate::document::id::derive_document_id;
use crate::document::transition::{
    DocumentBaseTransition, DocumentCreateTransition, DocumentDeleteTransition,
    DocumentReplaceTransition, DocumentTransition, DocumentsBatchTransition,
};
use crate::identifier::Identifier;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from document/batch construction.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The contract does not declare the requested document type.
    #[error("document type '{document_type}' is not defined in contract {data_contract_id}")]
    UndefinedDocumentType {
        /// The type that was requested.
        document_type: String,
        /// The contract that was consulted.
        data_contract_id: Identifier,
    },

    /// A batch needs at least one transition.
    #[error("a documents batch requires at least {MIN_BATCH_TRANSITIONS} transition")]
    NoTransitions,

    /// A batch is capped at ten transitions.
    #[error("too many transitions in batch: {count} (maximum {MAX_BATCH_TRANSITIONS})")]
    TooManyTransitions {
        /// How many were provided.
        count: usize,
    },

    /// Two transitions in the batch target the same `(type, id)`.
    #[error("duplicate transition for document '{document_type}' {id}")]
    DuplicateDocument {
        /// Document type of the duplicate.
        document_type: String,
        /// Document id of the duplicate.
        id: Identifier,
    },
}

// ---------------------------------------------------------------------------
// DocumentFactory
// ---------------------------------------------------------------------------

/// Builds document transitions and batches.
///
/// Stateless; exists as a value so callers can hold one per session and so
/// the construction surface stays mockable at the seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentFactory;

impl DocumentFactory {
    /// A new factory.
    pub fn new() -> Self {
        Self
    }

    /// Build a create transition: fresh entropy, derived id, timestamps
    /// where the document type requires them.
    pub fn create(
        &self,
        contract: &DataContract,
        owner_id: &Identifier,
        document_type: &str,
        data: Map<String, Value>,
    ) -> Result<DocumentTransition, FactoryError> {
        let schema = contract.document_schema(document_type).ok_or_else(|| {
            FactoryError::UndefinedDocumentType {
                document_type: document_type.to_string(),
                data_contract_id: contract.id,
            }
        })?;

        let entropy = generate_entropy();
        let id = derive_document_id(&contract.id, owner_id, document_type, &entropy);

        let requires = |field: &str| {
            schema
                .get("required")
                .and_then(Value::as_array)
                .map(|req| req.iter().filter_map(Value::as_str).any(|r| r == field))
                .unwrap_or(false)
        };
        let now = Utc::now().timestamp_millis() as u64;
        let created_at = requires("$createdAt").then_some(now);
        let updated_at = requires("$updatedAt").then_some(now);

        Ok(DocumentTransition::Create(DocumentCreateTransition {
            base: DocumentBaseTransition {
                id,
                data_contract_id: contract.id,
                document_type: document_type.to_string(),
            },
            entropy,
            created_at,
            updated_at,
            data,
        }))
    }

    /// Build a replace transition for an existing document.
    ///
    /// `revision` is the revision being *written* (stored revision + 1);
    /// the first replace of a fresh document writes revision 2, since
    /// creation wrote [`INITIAL_REVISION`].
    pub fn replace(
        &self,
        contract: &DataContract,
        document_id: Identifier,
        document_type: &str,
        revision: u64,
        data: Map<String, Value>,
    ) -> Result<DocumentTransition, FactoryError> {
        let schema = contract.document_schema(document_type).ok_or_else(|| {
            FactoryError::UndefinedDocumentType {
                document_type: document_type.to_string(),
                data_contract_id: contract.id,
            }
        })?;

        let requires_updated_at = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|req| req.iter().filter_map(Value::as_str).any(|r| r == "$updatedAt"))
            .unwrap_or(false);
        let updated_at = requires_updated_at.then(|| Utc::now().timestamp_millis() as u64);

        Ok(DocumentTransition::Replace(DocumentReplaceTransition {
            base: DocumentBaseTransition {
                id: document_id,
                data_contract_id: contract.id,
                document_type: document_type.to_string(),
            },
            revision,
            updated_at,
            data,
        }))
    }

    /// Build a delete transition for an existing document.
    pub fn delete(
        &self,
        contract: &DataContract,
        document_id: Identifier,
        document_type: &str,
    ) -> Result<DocumentTransition, FactoryError> {
        if !contract.is_document_defined(document_type) {
            return Err(FactoryError::UndefinedDocumentType {
                document_type: document_type.to_string(),
                data_contract_id: contract.id,
            });
        }

        Ok(DocumentTransition::Delete(DocumentDeleteTransition {
            base: DocumentBaseTransition {
                id: document_id,
                data_contract_id: contract.id,
                document_type: document_type.to_string(),
            },
        }))
    }

    /// Assemble transitions into an unsigned batch, enforcing the size
    /// bounds and rejecting `(type, id)` duplicates up front — cheaper to
    /// refuse here than to round-trip through validation.
    pub fn batch(
        &self,
        owner_id: Identifier,
        transitions: Vec<DocumentTransition>,
    ) -> Result<DocumentsBatchTransition, FactoryError> {
        if transitions.is_empty() {
            return Err(FactoryError::NoTransitions);
        }
        if transitions.len() > MAX_BATCH_TRANSITIONS {
            return Err(FactoryError::TooManyTransitions {
                count: transitions.len(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for transition in &transitions {
            let base = transition.base();
            if !seen.insert((base.document_type.clone(), base.id)) {
                return Err(FactoryError::DuplicateDocument {
                    document_type: base.document_type.clone(),
                    id: base.id,
                });
            }
        }

        Ok(DocumentsBatchTransition::new(owner_id, transitions))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
