#![forbid(unsafe_code)]

//! Credential management for NFTS signing.
//!
//! Loads RSA keys from PEM, DER, and PKCS#12 (.pfx/.p12) files. The PKCS#12
//! path covers Brazilian A1 certificates, including the legacy
//! PBE-SHA1-3DES encryption they usually ship with.

pub mod credential;
pub mod kdf;
pub mod loader;
pub mod pkcs12;

pub use credential::Credential;
pub use loader::load_credential_file;
pub use pkcs12::{parse_pfx, Pkcs12Contents};
