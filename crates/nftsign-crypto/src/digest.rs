#![forbid(unsafe_code)]

//! SHA-1 digest helper.

use sha1::{Digest, Sha1};

/// Compute the SHA-1 digest of `data` in one shot.
///
/// The signature scheme hashes internally; this helper exists for the
/// debug dump files, which record the digest of each canonical byte form.
pub fn sha1_digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    Digest::update(&mut hasher, data);
    Digest::finalize(hasher).into()
}
