#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signing and verification over SHA-1.

use nftsign_core::{Error, Result};
use signature::SignatureEncoding;

/// Sign `data` with RSA PKCS#1 v1.5 over SHA-1.
///
/// Returns the raw signature bytes (same length as the key modulus).
pub fn sign_sha1_rsa(private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    use signature::Signer;
    let sk = rsa::pkcs1v15::SigningKey::<sha1::Sha1>::new(private_key.clone());
    let sig = sk
        .try_sign(data)
        .map_err(|e| Error::SigningBackend(e.to_string()))?;
    Ok(sig.to_vec())
}

/// Verify an RSA PKCS#1 v1.5 / SHA-1 signature over `data`.
///
/// A signature that does not match yields `Ok(false)`; `Err` is reserved
/// for structurally unusable input such as a signature of the wrong size.
pub fn verify_sha1_rsa(public_key: &rsa::RsaPublicKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool> {
    use signature::Verifier;
    let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
        .map_err(|e| Error::VerificationBackend(format!("invalid RSA signature: {e}")))?;
    let vk = rsa::pkcs1v15::VerifyingKey::<sha1::Sha1>::new(public_key.clone());
    Ok(vk.verify(data, &sig).is_ok())
}
