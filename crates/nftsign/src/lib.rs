#![forbid(unsafe_code)]

pub use nftsign_canonical as canonical;
pub use nftsign_core as core;
pub use nftsign_crypto as crypto;
pub use nftsign_keys as keys;
pub use nftsign_model as model;
pub use nftsign_signer as signer;

pub mod soap;
