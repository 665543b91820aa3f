#![forbid(unsafe_code)]

//! Signing credentials.

use nftsign_core::{Error, Result};
use rsa::traits::PublicKeyParts;

/// An RSA credential loaded from a key file or an A1 certificate.
///
/// The private half is optional: a credential built from a certificate
/// alone can verify signatures but not produce them.
pub struct Credential {
    private: Option<rsa::RsaPrivateKey>,
    public: rsa::RsaPublicKey,
    /// DER-encoded X.509 certificates that came with the key, if any.
    pub certificates: Vec<Vec<u8>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.private.is_some() {
            "RSA private+public"
        } else {
            "RSA public"
        };
        write!(
            f,
            "Credential({kind}, {} bits, {} certificate(s))",
            self.public.n().bits(),
            self.certificates.len()
        )
    }
}

impl Credential {
    /// Credential that can both sign and verify.
    pub fn with_private(private: rsa::RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self {
            private: Some(private),
            public,
            certificates: Vec::new(),
        }
    }

    /// Verify-only credential from a bare public key.
    pub fn verify_only(public: rsa::RsaPublicKey) -> Self {
        Self {
            private: None,
            public,
            certificates: Vec::new(),
        }
    }

    /// Attach the certificate chain extracted alongside the key.
    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// The private key, or [`Error::NoPrivateKey`] for verify-only
    /// credentials.
    pub fn private_key(&self) -> Result<&rsa::RsaPrivateKey> {
        self.private.as_ref().ok_or(Error::NoPrivateKey)
    }

    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public
    }
}
