//! # Batch Validator — Consensus-Grade Structural Validation
//!
//! Validates a raw documents-batch transition the way the platform will,
//! so a client can reject a doomed submission before burning a network
//! round trip on it.
//!
//! The checks run **cheapest first** to fail fast and minimize I/O:
//!
//! 1. Envelope schema (version, type, owner shape, 1..=10 transitions).
//!    A failure here aborts — no contract is ever fetched.
//! 2. Group transitions by `$dataContractId`; malformed or missing ids are
//!    recorded and excluded from deeper checks.
//! 3. Fetch each group's contract. A missing contract stops deeper checks
//!    for *that group only* — other groups keep validating.
//! 4. Per transition: `$type` declared, `$action` known, enriched-schema
//!    validation over the content-encoded form; for creates, id
//!    re-derivation and entropy format.
//! 5. Batch-wide duplicate detection, by `(type, id)` and by
//!    contract-declared unique index values.
//! 6. Signer identity existence, then the signature itself — last, because
//!    it is the most expensive check and irrelevant once anything
//!    structural has already failed.
//!
//! Errors from independent transitions and groups all accumulate into one
//! [`ValidationResult`]; the caller gets the complete picture in one pass.

use std::collections::BTreeMap;

use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{ENTROPY_LENGTH, MIN_SUPPORTED_PROTOCOL_VERSION, PROTOCOL_VERSION};
use crate::data_contract::DataContract;
use crate::document::id::derive_document_id;
use crate::document::schema::{
    base_transition_schema, documents_batch_schema, encode_binary_properties, enriched_schema,
};
use crate::document::transition::{Action, DocumentsBatchTransition, TransitionError};
use crate::identifier::Identifier;
use crate::identity::{Ed25519SignatureVerifier, SignatureVerifier};
use crate::state_repository::{RepositoryError, StateRepository};
use crate::validation::{value_to_bytes, ConsensusError, ValidationResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Internal validator failures.
///
/// These are *not* consensus errors: they mean the validator itself could
/// not run to completion (schema would not compile, the repository broke,
/// a post-schema value failed to parse). Consensus verdicts travel in the
/// returned [`ValidationResult`] instead.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// A schema failed to compile. Indicates a bug or contract corruption.
    #[error("unable to compile schema: {0}")]
    SchemaCompilation(String),

    /// The state repository failed mid-validation.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A raw value that passed schema validation still failed to parse.
    #[error(transparent)]
    MalformedTransition(#[from] TransitionError),
}

// ---------------------------------------------------------------------------
// BatchValidator
// ---------------------------------------------------------------------------

/// Validates raw documents-batch transitions against platform rules.
pub struct BatchValidator<S, V = Ed25519SignatureVerifier> {
    state_repository: S,
    signature_verifier: V,
    envelope_schema: JSONSchema,
}

impl<S: StateRepository> BatchValidator<S> {
    /// A validator with the stock Ed25519 signature verifier.
    pub fn new(state_repository: S) -> Result<Self, ValidatorError> {
        Self::with_verifier(state_repository, Ed25519SignatureVerifier)
    }
}

impl<S: StateRepository, V: SignatureVerifier> BatchValidator<S, V> {
    /// A validator with a caller-supplied signature verifier.
    pub fn with_verifier(state_repository: S, signature_verifier: V) -> Result<Self, ValidatorError> {
        let schema = documents_batch_schema();
        let envelope_schema = JSONSchema::compile(&schema)
            .map_err(|e| ValidatorError::SchemaCompilation(e.to_string()))?;
        Ok(Self {
            state_repository,
            signature_verifier,
            envelope_schema,
        })
    }

    /// Validate a raw batch. An empty result means the batch is
    /// submittable as-is.
    pub async fn validate(&self, raw: &Value) -> Result<ValidationResult, ValidatorError> {
        let mut result = ValidationResult::new();

        // 1. Envelope shape. Abort on failure: nothing below can be
        //    trusted, and no contract fetch is attempted.
        for violation in schema_violations(&self.envelope_schema, raw) {
            result.add_error(violation);
        }
        if !result.is_valid() {
            return Ok(result);
        }

        let version = raw["protocolVersion"].as_u64().unwrap_or(0) as u32;
        if !(MIN_SUPPORTED_PROTOCOL_VERSION..=PROTOCOL_VERSION).contains(&version) {
            result.add_error(ConsensusError::UnsupportedProtocolVersion {
                version,
                minimum: MIN_SUPPORTED_PROTOCOL_VERSION,
                maximum: PROTOCOL_VERSION,
            });
            return Ok(result);
        }

        // Schema-validated, so this parse cannot reasonably fail; the
        // fallback error keeps us honest if the schema ever drifts.
        let owner_id = match value_to_bytes(raw.get("ownerId"))
            .and_then(|b| Identifier::from_bytes(&b).ok())
        {
            Some(id) => id,
            None => {
                result.add_error(ConsensusError::InvalidIdentifier {
                    identifier_name: "ownerId".into(),
                    reason: "not a 32-byte array".into(),
                });
                return Ok(result);
            }
        };

        let transitions: Vec<&Value> = raw["transitions"]
            .as_array()
            .map(|a| a.iter().collect())
            .unwrap_or_default();

        // 2. Group by contract id, excluding transitions whose contract
        //    reference is missing or malformed.
        let mut groups: BTreeMap<Identifier, Vec<&Value>> = BTreeMap::new();
        for &raw_transition in &transitions {
            match raw_transition.get("$dataContractId") {
                None => result.add_error(ConsensusError::MissingDataContractId),
                Some(value) => match value_to_bytes(Some(value))
                    .ok_or_else(|| "not a byte array".to_string())
                    .and_then(|b| Identifier::from_bytes(&b).map_err(|e| e.to_string()))
                {
                    Ok(contract_id) => groups.entry(contract_id).or_default().push(raw_transition),
                    Err(reason) => result.add_error(ConsensusError::InvalidIdentifier {
                        identifier_name: "$dataContractId".into(),
                        reason,
                    }),
                },
            }
        }

        // 3. Fetch each group's contract and run per-transition checks.
        //    A missing contract short-circuits its own group only.
        let mut contracts: BTreeMap<Identifier, DataContract> = BTreeMap::new();
        for (contract_id, group) in &groups {
            debug!(contract = %contract_id, transitions = group.len(), "fetching data contract");
            match self.state_repository.fetch_data_contract(contract_id).await? {
                None => {
                    debug!(contract = %contract_id, "data contract not present");
                    result.add_error(ConsensusError::DataContractNotPresent {
                        data_contract_id: *contract_id,
                    });
                }
                Some(contract) => {
                    result.merge(self.validate_group(&contract, &owner_id, group)?);
                    contracts.insert(*contract_id, contract);
                }
            }
        }

        // 4. Duplicate detection, only once every per-transition check has
        //    passed — duplicate analysis over known-bad transitions would
        //    just echo noise.
        if result.is_valid() {
            let duplicate_ids = find_duplicates_by_id(&transitions);
            if !duplicate_ids.is_empty() {
                result.add_error(ConsensusError::DuplicateDocumentTransitions {
                    references: duplicate_ids,
                });
            }

            for (contract_id, contract) in &contracts {
                let duplicates = find_duplicates_by_indices(&groups[contract_id], contract);
                if !duplicates.is_empty() {
                    result.add_error(ConsensusError::DuplicateDocumentTransitions {
                        references: duplicates,
                    });
                }
            }
        }

        // 5. Identity existence, then signature. Most expensive; skipped
        //    entirely once anything structural has failed.
        if result.is_valid() {
            match self.state_repository.fetch_identity(&owner_id).await? {
                None => {
                    result.add_error(ConsensusError::IdentityNotFound {
                        identity_id: owner_id,
                    });
                }
                Some(identity) => {
                    let batch = DocumentsBatchTransition::from_raw_object(raw)?;
                    match identity.public_key_by_id(batch.signature_public_key_id) {
                        None => result.add_error(ConsensusError::MissingPublicKey {
                            public_key_id: batch.signature_public_key_id,
                        }),
                        Some(key) => {
                            if self
                                .signature_verifier
                                .verify(&batch.signable_bytes(), key, &batch.signature)
                                .is_err()
                            {
                                result.add_error(ConsensusError::InvalidStateTransitionSignature);
                            }
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// Per-transition checks for one contract's group. Errors accumulate
    /// across transitions; each failed transition is skipped for its own
    /// deeper checks only.
    fn validate_group(
        &self,
        contract: &DataContract,
        owner_id: &Identifier,
        transitions: &[&Value],
    ) -> Result<ValidationResult, ValidatorError> {
        let mut result = ValidationResult::new();

        for raw_transition in transitions {
            let Some(document_type) = raw_transition.get("$type").and_then(Value::as_str) else {
                result.add_error(ConsensusError::MissingDocumentType);
                continue;
            };
            if !contract.is_document_defined(document_type) {
                result.add_error(ConsensusError::InvalidDocumentType {
                    document_type: document_type.to_string(),
                    data_contract_id: contract.id,
                });
                continue;
            }

            let Some(action_code) = raw_transition.get("$action").and_then(Value::as_u64) else {
                result.add_error(ConsensusError::MissingDocumentTransitionAction);
                continue;
            };
            let Some(action) = Action::from_code(action_code) else {
                result.add_error(ConsensusError::InvalidDocumentTransitionAction {
                    action: action_code.to_string(),
                });
                continue;
            };

            // Schema validation runs over the content-encoded form: the
            // contract's binary fields become text, system byte fields stay
            // integer arrays.
            let encoded =
                encode_binary_properties(raw_transition, &contract.binary_properties(document_type));
            let schema_value = match action {
                Action::Delete => base_transition_schema(),
                Action::Create | Action::Replace => {
                    enriched_schema(contract, document_type, action)
                        .expect("document type existence checked above")
                }
            };
            let compiled = JSONSchema::compile(&schema_value)
                .map_err(|e| ValidatorError::SchemaCompilation(e.to_string()))?;
            let violations = schema_violations(&compiled, &encoded);
            if !violations.is_empty() {
                for violation in violations {
                    result.add_error(violation);
                }
                continue;
            }

            if action == Action::Create {
                let claimed_id = match value_to_bytes(raw_transition.get("$id"))
                    .and_then(|b| Identifier::from_bytes(&b).ok())
                {
                    Some(id) => id,
                    None => {
                        result.add_error(ConsensusError::InvalidIdentifier {
                            identifier_name: "$id".into(),
                            reason: "not a 32-byte array".into(),
                        });
                        continue;
                    }
                };

                let entropy =
                    value_to_bytes(raw_transition.get("$entropy")).unwrap_or_default();
                let expected_id =
                    derive_document_id(&contract.id, owner_id, document_type, &entropy);
                if expected_id != claimed_id {
                    result.add_error(ConsensusError::InvalidDocumentTransitionId {
                        expected_id,
                        invalid_id: claimed_id,
                    });
                }
                if entropy.len() != ENTROPY_LENGTH {
                    result.add_error(ConsensusError::InvalidDocumentTransitionEntropy {
                        reason: format!(
                            "expected {ENTROPY_LENGTH} bytes, got {}",
                            entropy.len()
                        ),
                    });
                }
            }
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a compiled schema and convert violations into consensus errors.
fn schema_violations(schema: &JSONSchema, instance: &Value) -> Vec<ConsensusError> {
    match schema.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| {
                let schema_path = error.schema_path.to_string();
                let keyword = schema_path
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                ConsensusError::JsonSchemaViolation {
                    instance_path: error.instance_path.to_string(),
                    schema_path,
                    keyword,
                    message: error.to_string(),
                }
            })
            .collect(),
    }
}

/// Transitions sharing a `(type, id)` pair. Returns every offender, in
/// batch order, so the error names both sides of each collision.
fn find_duplicates_by_id(transitions: &[&Value]) -> Vec<(String, Identifier)> {
    let mut counts: BTreeMap<(String, Vec<u8>), usize> = BTreeMap::new();
    let key = |t: &Value| -> Option<(String, Vec<u8>)> {
        Some((
            t.get("$type")?.as_str()?.to_string(),
            value_to_bytes(t.get("$id"))?,
        ))
    };

    for transition in transitions {
        if let Some(k) = key(transition) {
            *counts.entry(k).or_insert(0) += 1;
        }
    }

    transitions
        .iter()
        .filter_map(|t| {
            let k = key(t)?;
            if counts[&k] > 1 {
                let id = Identifier::from_bytes(&k.1).ok()?;
                Some((k.0, id))
            } else {
                None
            }
        })
        .collect()
}

/// Transitions of the same type that collide on every property of some
/// contract-declared unique index. Deletes are skipped — they carry no
/// data to collide on.
fn find_duplicates_by_indices(
    transitions: &[&Value],
    contract: &DataContract,
) -> Vec<(String, Identifier)> {
    let is_delete =
        |t: &Value| t.get("$action").and_then(Value::as_u64) == Some(Action::Delete.code());

    let mut offenders = vec![false; transitions.len()];
    for i in 0..transitions.len() {
        for j in (i + 1)..transitions.len() {
            let (a, b) = (transitions[i], transitions[j]);
            if is_delete(a) || is_delete(b) {
                continue;
            }
            let (Some(type_a), Some(type_b)) = (
                a.get("$type").and_then(Value::as_str),
                b.get("$type").and_then(Value::as_str),
            ) else {
                continue;
            };
            if type_a != type_b {
                continue;
            }

            let collides = contract
                .unique_indices(type_a)
                .iter()
                .filter(|index| !index.properties.is_empty())
                .any(|index| {
                    index
                        .properties
                        .iter()
                        .all(|property| lookup_path(a, property) == lookup_path(b, property))
                });
            if collides {
                offenders[i] = true;
                offenders[j] = true;
            }
        }
    }

    transitions
        .iter()
        .zip(&offenders)
        .filter(|(_, &flagged)| flagged)
        .filter_map(|(t, _)| {
            Some((
                t.get("$type")?.as_str()?.to_string(),
                Identifier::from_bytes(&value_to_bytes(t.get("$id"))?).ok()?,
            ))
        })
        .collect()
}

/// Walk a dot-separated property path into a raw JSON object.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::factory::DocumentFactory;
    use crate::identity::{Identity, IdentityPublicKey, KeyType};
    use crate::state_repository::FetchedTransaction;
    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::{json, Map};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // -- fixtures ---------------------------------------------------------

    struct TestRepository {
        contracts: HashMap<Identifier, DataContract>,
        identities: HashMap<Identifier, Identity>,
        contract_fetches: Arc<AtomicUsize>,
    }

    impl TestRepository {
        fn new() -> Self {
            Self {
                contracts: HashMap::new(),
                identities: HashMap::new(),
                contract_fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_contract(mut self, contract: DataContract) -> Self {
            self.contracts.insert(contract.id, contract);
            self
        }

        fn with_identity(mut self, identity: Identity) -> Self {
            self.identities.insert(identity.id, identity);
            self
        }
    }

    #[async_trait]
    impl StateRepository for TestRepository {
        async fn fetch_identity(
            &self,
            id: &Identifier,
        ) -> Result<Option<Identity>, RepositoryError> {
            Ok(self.identities.get(id).cloned())
        }

        async fn fetch_data_contract(
            &self,
            id: &Identifier,
        ) -> Result<Option<DataContract>, RepositoryError> {
            self.contract_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.contracts.get(id).cloned())
        }

        async fn fetch_transaction(
            &self,
            _tx_hash: &[u8; 32],
        ) -> Result<Option<FetchedTransaction>, RepositoryError> {
            Ok(None)
        }

        async fn fetch_latest_platform_core_chain_locked_height(
            &self,
        ) -> Result<u32, RepositoryError> {
            Ok(0)
        }

        async fn is_asset_lock_out_point_already_used(
            &self,
            _out_point: &[u8; 36],
        ) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn verify_instant_lock(
            &self,
            _instant_lock: &[u8],
        ) -> Result<bool, RepositoryError> {
            Ok(true)
        }
    }

    fn test_contract() -> DataContract {
        let mut documents = std::collections::BTreeMap::new();
        documents.insert(
            "note".to_string(),
            json!({
                "type": "object",
                "indices": [
                    {
                        "name": "byLabel",
                        "properties": [{ "label": "asc" }],
                        "unique": true
                    }
                ],
                "properties": {
                    "label": { "type": "string" }
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

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    fn owner_id() -> Identifier {
        Identifier::new([2u8; 32])
    }

    fn test_identity() -> Identity {
        Identity {
            id: owner_id(),
            public_keys: vec![IdentityPublicKey {
                id: 0,
                key_type: KeyType::Ed25519,
                data: signing_key().verifying_key().to_bytes().to_vec(),
            }],
            balance: 10_000,
            revision: 0,
        }
    }

    fn label_data(label: &str) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("label".into(), json!(label));
        data
    }

    /// A signed, fully valid single-create batch in raw form.
    fn signed_raw_batch(labels: &[&str]) -> Value {
        let factory = DocumentFactory::new();
        let contract = test_contract();
        let transitions = labels
            .iter()
            .map(|label| {
                factory
                    .create(&contract, &owner_id(), "note", label_data(label))
                    .unwrap()
            })
            .collect();
        let mut batch = DocumentsBatchTransition::new(owner_id(), transitions);
        let signature = signing_key().sign(&batch.signable_bytes());
        batch.set_signature(signature.to_bytes().to_vec(), 0);
        batch.to_raw_object()
    }

    fn full_repository() -> TestRepository {
        TestRepository::new()
            .with_contract(test_contract())
            .with_identity(test_identity())
    }

    // -- envelope ---------------------------------------------------------

    #[tokio::test]
    async fn valid_batch_passes() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator.validate(&signed_raw_batch(&["hello"])).await.unwrap();
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[tokio::test]
    async fn missing_envelope_property_fails_before_any_fetch() {
        let repo = full_repository();
        let fetches = repo.contract_fetches.clone();
        let validator = BatchValidator::new(repo).unwrap();

        for property in ["protocolVersion", "type", "ownerId", "transitions", "signature"] {
            let mut raw = signed_raw_batch(&["hello"]);
            raw.as_object_mut().unwrap().remove(property);

            let result = validator.validate(&raw).await.unwrap();
            let error = result.first_error().expect("schema error expected");
            assert_eq!(error.code(), 1005, "property {property}");
            assert_eq!(error.schema_keyword(), Some("required"));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_and_oversized_batches_fail_before_any_fetch() {
        let repo = full_repository();
        let fetches = repo.contract_fetches.clone();
        let validator = BatchValidator::new(repo).unwrap();

        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"] = json!([]);
        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().schema_keyword(), Some("minItems"));

        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"] = Value::Array((0..11).map(|_| json!({})).collect());
        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().schema_keyword(), Some("maxItems"));

        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_protocol_version_is_rejected() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["protocolVersion"] = json!(999);

        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1002);
    }

    // -- grouping & contracts --------------------------------------------

    #[tokio::test]
    async fn missing_data_contract_id_is_recorded() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0]
            .as_object_mut()
            .unwrap()
            .remove("$dataContractId");

        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1025);
    }

    #[tokio::test]
    async fn malformed_data_contract_id_is_recorded() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0]["$dataContractId"] = json!(vec![0u8; 31]);

        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1006);
    }

    #[tokio::test]
    async fn missing_contract_short_circuits_its_group_only() {
        // One transition references an unknown contract; another (from the
        // known contract) carries a recognizable deep error. Both must be
        // reported: the unknown contract stops checks for its group only.
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello", "world"]);
        raw["transitions"][0]["$dataContractId"] = json!(vec![9u8; 32]);
        raw["transitions"][1]["$type"] = json!("wrong");

        let result = validator.validate(&raw).await.unwrap();
        let codes: Vec<u32> = result.errors().iter().map(ConsensusError::code).collect();
        assert!(codes.contains(&1018), "{codes:?}");
        assert!(codes.contains(&1024), "{codes:?}");
    }

    // -- per-transition checks -------------------------------------------

    #[tokio::test]
    async fn undeclared_document_type_is_rejected() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0]["$type"] = json!("wrong");

        let result = validator.validate(&raw).await.unwrap();
        let error = result.first_error().unwrap();
        assert_eq!(error.code(), 1024);
        assert_eq!(error.data_contract_id(), Some(&test_contract().id));
    }

    #[tokio::test]
    async fn missing_document_type_is_rejected() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0].as_object_mut().unwrap().remove("$type");

        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1027);
    }

    #[tokio::test]
    async fn missing_and_invalid_actions_are_distinguished() {
        let validator = BatchValidator::new(full_repository()).unwrap();

        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0].as_object_mut().unwrap().remove("$action");
        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1026);

        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0]["$action"] = json!(4);
        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 1022);
    }

    #[tokio::test]
    async fn replace_with_zero_revision_fails_schema_minimum() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        {
            let t = raw["transitions"][0].as_object_mut().unwrap();
            t.insert("$action".into(), json!(1));
            t.insert("$revision".into(), json!(0));
            t.remove("$entropy");
        }

        let result = validator.validate(&raw).await.unwrap();
        let error = result.first_error().unwrap();
        assert_eq!(error.code(), 1005);
        assert_eq!(error.schema_keyword(), Some("minimum"));
        assert_eq!(error.instance_path(), Some("/$revision"));
    }

    #[tokio::test]
    async fn tampered_create_id_fails_alone() {
        // Two creates; only the first gets its id tampered. The second
        // must sail through untouched.
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello", "world"]);
        raw["transitions"][0]["$id"] = json!(vec![0xEEu8; 32]);

        let result = validator.validate(&raw).await.unwrap();
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.first_error().unwrap().code(), 1023);
    }

    #[tokio::test]
    async fn short_entropy_fails_with_entropy_error() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let mut raw = signed_raw_batch(&["hello"]);
        raw["transitions"][0]["$entropy"] = json!(vec![5u8; 16]);

        let result = validator.validate(&raw).await.unwrap();
        let codes: Vec<u32> = result.errors().iter().map(ConsensusError::code).collect();
        assert!(codes.contains(&1040), "{codes:?}");
    }

    // -- duplicates -------------------------------------------------------

    #[tokio::test]
    async fn duplicate_type_and_id_pair_is_rejected_listing_both() {
        let factory = DocumentFactory::new();
        let contract = test_contract();
        let create = factory
            .create(&contract, &owner_id(), "note", label_data("same"))
            .unwrap();
        let mut batch =
            DocumentsBatchTransition::new(owner_id(), vec![create.clone(), create]);
        let signature = signing_key().sign(&batch.signable_bytes());
        batch.set_signature(signature.to_bytes().to_vec(), 0);

        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator.validate(&batch.to_raw_object()).await.unwrap();

        let duplicate = result
            .errors()
            .iter()
            .find(|e| e.code() == 1019)
            .expect("duplicate error expected");
        let ConsensusError::DuplicateDocumentTransitions { references } = duplicate else {
            unreachable!()
        };
        assert_eq!(references.len(), 2);
        assert_eq!(references[0], references[1]);
    }

    #[tokio::test]
    async fn unique_index_collision_is_rejected() {
        // Distinct ids, same label — collides on the unique byLabel index.
        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator
            .validate(&signed_raw_batch(&["same", "same"]))
            .await
            .unwrap();

        let duplicate = result
            .errors()
            .iter()
            .find(|e| e.code() == 1019)
            .expect("duplicate error expected");
        let ConsensusError::DuplicateDocumentTransitions { references } = duplicate else {
            unreachable!()
        };
        assert_eq!(references.len(), 2);
        assert_ne!(references[0].1, references[1].1);
    }

    #[tokio::test]
    async fn distinct_index_values_do_not_collide() {
        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator
            .validate(&signed_raw_batch(&["alpha", "beta"]))
            .await
            .unwrap();
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    // -- identity & signature --------------------------------------------

    #[tokio::test]
    async fn unknown_identity_is_rejected() {
        let repo = TestRepository::new().with_contract(test_contract());
        let validator = BatchValidator::new(repo).unwrap();
        let result = validator.validate(&signed_raw_batch(&["hello"])).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 2000);
    }

    #[tokio::test]
    async fn unknown_signing_key_is_rejected() {
        let factory = DocumentFactory::new();
        let contract = test_contract();
        let create = factory
            .create(&contract, &owner_id(), "note", label_data("hello"))
            .unwrap();
        let mut batch = DocumentsBatchTransition::new(owner_id(), vec![create]);
        let signature = signing_key().sign(&batch.signable_bytes());
        batch.set_signature(signature.to_bytes().to_vec(), 9);

        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator.validate(&batch.to_raw_object()).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 2004);
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected() {
        let factory = DocumentFactory::new();
        let contract = test_contract();
        let create = factory
            .create(&contract, &owner_id(), "note", label_data("hello"))
            .unwrap();
        let mut batch = DocumentsBatchTransition::new(owner_id(), vec![create]);
        // Signed by a key the identity does not hold.
        let rogue = SigningKey::from_bytes(&[13u8; 32]);
        let signature = rogue.sign(&batch.signable_bytes());
        batch.set_signature(signature.to_bytes().to_vec(), 0);

        let validator = BatchValidator::new(full_repository()).unwrap();
        let result = validator.validate(&batch.to_raw_object()).await.unwrap();
        assert_eq!(result.first_error().unwrap().code(), 2002);
    }
}
