#![forbid(unsafe_code)]

//! Cryptographic primitives for the nftsign NFTS signing library.
//!
//! The São Paulo NFTS web service mandates RSA PKCS#1 v1.5 over SHA-1,
//! so that is the only algorithm pair implemented here.

pub mod digest;
pub mod sign;

pub use digest::sha1_digest;
pub use sign::{sign_sha1_rsa, verify_sha1_rsa};
