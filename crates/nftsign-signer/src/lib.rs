#![forbid(unsafe_code)]

//! Signing and verification orchestration for NFTS documents.
//!
//! Ties the layers together: parse a submission batch, canonicalize each
//! `NFTS` element, sign or verify it, and splice signed elements back into
//! the surrounding document.

pub mod sign;
pub mod verify;

pub use sign::{sign_batch, sign_document};
pub use verify::{verify_batch, verify_document, VerifyOutcome};
