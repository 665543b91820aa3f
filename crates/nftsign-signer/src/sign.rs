#![forbid(unsafe_code)]

//! Signing of single documents and whole submission batches.

use std::path::Path;

use nftsign_canonical::canonical_bytes;
use nftsign_core::names::node;
use nftsign_core::{Error, Result};
use nftsign_crypto::{sha1_digest, sign_sha1_rsa};
use nftsign_keys::Credential;
use nftsign_model::{parse_nfts, wrapper_xml, TaxDocument};

/// Sign one document: canonical bytes, SHA-1, RSA PKCS#1 v1.5.
///
/// Returns the raw signature bytes; the caller stores them in the
/// document's signature field and Base64-encodes them for embedding.
pub fn sign_document(doc: &TaxDocument, credential: &Credential) -> Result<Vec<u8>> {
    let canonical = canonical_bytes(doc)?;
    sign_sha1_rsa(credential.private_key()?, &canonical)
}

/// Sign every `NFTS` element in a batch document.
///
/// Each element is parsed, signed, and re-emitted in schema order with its
/// `Assinatura` filled in. Everything outside the `NFTS` elements — the
/// XML declaration, the batch header, whitespace — is spliced through
/// byte-for-byte. With `dump_dir` set, per-document artifacts are written
/// for diffing against the authority's reference tooling.
pub fn sign_batch(
    xml: &str,
    credential: &Credential,
    dump_dir: Option<&Path>,
) -> Result<String> {
    let tree = roxmltree::Document::parse(xml).map_err(|e| Error::XmlParse(e.to_string()))?;

    let nfts_nodes: Vec<roxmltree::Node> = tree
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == node::NFTS)
        .collect();
    if nfts_nodes.is_empty() {
        return Err(Error::MissingElement(node::NFTS.to_string()));
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0usize;

    for (i, nfts) in nfts_nodes.iter().enumerate() {
        let index = i + 1;
        let mut doc = parse_nfts(*nfts)?;

        let canonical = canonical_bytes(&doc)?;
        let signature = sign_sha1_rsa(credential.private_key()?, &canonical)?;

        if let Some(dir) = dump_dir {
            dump_artifacts(dir, index, &canonical, &signature)?;
        }

        doc.signature = Some(signature);

        let range = nfts.range();
        out.push_str(&xml[cursor..range.start]);
        out.push_str(&wrapper_xml(&doc));
        cursor = range.end;
    }

    out.push_str(&xml[cursor..]);
    Ok(out)
}

/// Debug artifacts for document `index` (1-based): the canonical buffer as
/// bytes and text, its SHA-1, and the signature raw and Base64.
fn dump_artifacts(dir: &Path, index: usize, canonical: &[u8], signature: &[u8]) -> Result<()> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(format!("canonical_NFTS_{index}.bin")), canonical)?;
    std::fs::write(dir.join(format!("canonical_NFTS_{index}.txt")), canonical)?;
    std::fs::write(
        dir.join(format!("hash_NFTS_{index}.bin")),
        sha1_digest(canonical),
    )?;
    std::fs::write(dir.join(format!("signature_NFTS_{index}.bin")), signature)?;
    std::fs::write(
        dir.join(format!("signature_NFTS_{index}.b64")),
        BASE64.encode(signature),
    )?;
    Ok(())
}
