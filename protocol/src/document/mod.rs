//! # Documents — Transitions, Construction, Validation
//!
//! Documents are the platform's user data: JSON records conforming to a
//! data contract's declared types. Clients never mutate documents directly;
//! they submit *document transitions* — Create, Replace, or Delete — packed
//! into a signed batch. This module owns that whole pipeline on the client
//! side:
//!
//! - [`id`] — deterministic document-id derivation.
//! - [`transition`] — the transition model and the signed batch envelope.
//! - [`factory`] — convenience construction (entropy, ids, timestamps).
//! - [`schema`] — base transition schemas, contract enrichment, and binary
//!   content encoding.
//! - [`validator`] — consensus-grade structural validation of a raw batch.

pub mod factory;
pub mod id;
pub mod schema;
pub mod transition;
pub mod validator;

pub use factory::DocumentFactory;
pub use id::derive_document_id;
pub use transition::{
    Action, DocumentBaseTransition, DocumentCreateTransition, DocumentDeleteTransition,
    DocumentReplaceTransition, DocumentTransition, DocumentsBatchTransition,
};
pub use validator::BatchValidator;
