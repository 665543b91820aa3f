#![forbid(unsafe_code)]

//! Signature verification for single documents and batches.

use nftsign_canonical::canonical_bytes;
use nftsign_core::names::node;
use nftsign_core::{Error, Result};
use nftsign_crypto::verify_sha1_rsa;
use nftsign_keys::Credential;
use nftsign_model::{parse_nfts, TaxDocument};

/// Result of checking one document's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid { reason: String },
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Valid)
    }

    fn invalid(reason: impl Into<String>) -> Self {
        VerifyOutcome::Invalid {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyOutcome::Valid => write!(f, "OK"),
            VerifyOutcome::Invalid { reason } => write!(f, "INVALID ({reason})"),
        }
    }
}

/// Verify a document's embedded signature against the credential's
/// public key.
///
/// The canonical form never contains the signature, so the checked bytes
/// are exactly what the signer produced. A cryptographic mismatch is a
/// normal `Invalid` outcome; a document with no signature at all is a
/// structural error.
pub fn verify_document(doc: &TaxDocument, credential: &Credential) -> Result<VerifyOutcome> {
    let signature = doc
        .signature
        .as_deref()
        .ok_or_else(|| Error::MissingElement(node::ASSINATURA.to_string()))?;

    let canonical = canonical_bytes(doc)?;
    if verify_sha1_rsa(credential.public_key(), &canonical, signature)? {
        Ok(VerifyOutcome::Valid)
    } else {
        Ok(VerifyOutcome::invalid("signature does not match document"))
    }
}

/// Verify every `NFTS` element in a batch document.
///
/// One outcome per element, in document order. A problem confined to one
/// document — missing signature, invalid Base64, a malformed field — is
/// reported as `Invalid` for that document and the rest are still checked.
pub fn verify_batch(xml: &str, credential: &Credential) -> Result<Vec<VerifyOutcome>> {
    let tree = roxmltree::Document::parse(xml).map_err(|e| Error::XmlParse(e.to_string()))?;

    let nfts_nodes: Vec<roxmltree::Node> = tree
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == node::NFTS)
        .collect();
    if nfts_nodes.is_empty() {
        return Err(Error::MissingElement(node::NFTS.to_string()));
    }

    let mut outcomes = Vec::with_capacity(nfts_nodes.len());
    for nfts in nfts_nodes {
        let outcome = match parse_nfts(nfts) {
            Ok(doc) => match verify_document(&doc, credential) {
                Ok(outcome) => outcome,
                Err(e) => VerifyOutcome::invalid(e.to_string()),
            },
            Err(e) => VerifyOutcome::invalid(e.to_string()),
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
