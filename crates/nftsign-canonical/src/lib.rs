#![forbid(unsafe_code)]

//! Canonical byte-form serialization of NFTS documents.
//!
//! The municipal authority hashes and signs an exact byte sequence: root
//! element `tpNFTS`, fixed field order, normalized field text, no XML
//! declaration, no namespaces, no whitespace between tags, UTF-8 without a
//! BOM. One divergent byte produces a signature the authority silently
//! rejects, so this crate is the compatibility contract of the whole
//! workspace.

pub mod builder;
pub mod escape;

pub use builder::canonical_bytes;
