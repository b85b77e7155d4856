//! Deterministic document-id derivation.
//!
//! A document id commits to *where* the document lives (contract), *who*
//! owns it (owner identity), *what* it is (document type), and a fresh
//! 32-byte entropy value. The same inputs always derive the same id, which
//! lets the validator recompute and compare instead of trusting whatever id
//! a transition claims.

use crate::crypto::double_sha256_multi;
use crate::identifier::Identifier;

/// Derive a document id from its four inputs.
///
/// `id = double_sha256(contract_id ‖ owner_id ‖ document_type ‖ entropy)`
///
/// Pure and total: any byte inputs produce a 32-byte id. Callers are
/// responsible for entropy quality; the derivation itself does not care.
///
/// # Example
///
/// ```
/// use meridian_protocol::document::derive_document_id;
/// use meridian_protocol::identifier::Identifier;
///
/// let contract = Identifier::new([1u8; 32]);
/// let owner = Identifier::new([2u8; 32]);
/// let id = derive_document_id(&contract, &owner, "note", &[0u8; 32]);
/// let again = derive_document_id(&contract, &owner, "note", &[0u8; 32]);
/// assert_eq!(id, again);
/// ```
pub fn derive_document_id(
    data_contract_id: &Identifier,
    owner_id: &Identifier,
    document_type: &str,
    entropy: &[u8],
) -> Identifier {
    let digest = double_sha256_multi(&[
        data_contract_id.as_bytes(),
        owner_id.as_bytes(),
        document_type.as_bytes(),
        entropy,
    ]);
    Identifier::new(digest)
}
