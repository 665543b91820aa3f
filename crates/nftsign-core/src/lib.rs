#![forbid(unsafe_code)]

//! Shared foundation for the nftsign workspace: the error taxonomy, the
//! NFTS element-name and namespace constants, and the field normalizers
//! that define the canonical textual form of every field class.

pub mod error;
pub mod names;
pub mod normalize;

pub use error::{Error, Result};
