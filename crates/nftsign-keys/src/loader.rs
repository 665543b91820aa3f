#![forbid(unsafe_code)]

//! Credential loading from PEM, DER, and PKCS#12 (A1) files.

use crate::credential::Credential;
use nftsign_core::{Error, Result};

/// Load an RSA private key from PEM data.
pub fn load_private_pem(pem_data: &[u8]) -> Result<Credential> {
    use pkcs8::DecodePrivateKey;
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Try PKCS#8 first
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(Credential::with_private(pk));
    }

    // Try PKCS#1
    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(Credential::with_private(pk))
}

/// Load an RSA public key from PEM data.
pub fn load_public_pem(pem_data: &[u8]) -> Result<Credential> {
    use pkcs8::DecodePublicKey;
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Try SPKI first
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(Credential::verify_only(pk));
    }

    // Try PKCS#1
    use pkcs1::DecodeRsaPublicKey;
    let pk = rsa::RsaPublicKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(Credential::verify_only(pk))
}

/// Load a private key from encrypted PEM (PKCS#8 ENCRYPTED PRIVATE KEY).
pub fn load_encrypted_pem(pem_data: &[u8], password: &str) -> Result<Credential> {
    use pkcs8::DecodePrivateKey;
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_encrypted_pem(pem_str, password) {
        return Ok(Credential::with_private(pk));
    }

    // Decrypt by hand via pem-rfc7468 + pkcs5, then parse what came out.
    if let Ok((_label, der_bytes)) = pem_rfc7468::decode_vec(pem_data) {
        use pkcs8::der::Decode;
        if let Ok(enc_pki) = pkcs8::EncryptedPrivateKeyInfo::from_der(&der_bytes) {
            if let Ok(doc) = enc_pki.decrypt(password) {
                if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(doc.as_bytes()) {
                    return Ok(Credential::with_private(pk));
                }
            }
        }
    }

    Err(Error::Key(
        "failed to decrypt encrypted PKCS#8 PEM (wrong password?)".into(),
    ))
}

/// Load a verify-only credential from a PEM-encoded X.509 certificate.
pub fn load_certificate_pem(pem_data: &[u8]) -> Result<Credential> {
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Trim trailing whitespace — some certificate files have extra newlines
    let trimmed = pem_str.trim();

    let (label, der_bytes) = pem_rfc7468::decode_vec(trimmed.as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode certificate PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(Error::Key(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }

    load_certificate_der(&der_bytes)
}

/// Load a verify-only credential from a DER-encoded X.509 certificate.
pub fn load_certificate_der(data: &[u8]) -> Result<Credential> {
    let public = rsa_public_from_certificate(data)?;
    Ok(Credential::verify_only(public).with_certificates(vec![data.to_vec()]))
}

fn rsa_public_from_certificate(data: &[u8]) -> Result<rsa::RsaPublicKey> {
    use der::{Decode, Encode};
    use spki::DecodePublicKey;
    use x509_cert::Certificate;

    let cert = Certificate::from_der(data)
        .map_err(|e| Error::Key(format!("failed to parse X.509 certificate: {e}")))?;

    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;

    rsa::RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| Error::Key(format!("certificate does not carry an RSA key: {e}")))
}

/// Load a credential from a PKCS#12 (.p12/.pfx) container.
///
/// A key bag yields a signing credential with the certificates attached;
/// a container with certificates only still yields a verify-only one.
pub fn load_pkcs12(data: &[u8], password: &str) -> Result<Credential> {
    use pkcs8::DecodePrivateKey;
    let contents = crate::pkcs12::parse_pfx(data, password)?;

    if let Some(pkcs8_der) = contents.private_keys.first() {
        let pk = rsa::RsaPrivateKey::from_pkcs8_der(pkcs8_der)
            .map_err(|e| Error::Key(format!("PKCS#12 private key is not RSA: {e}")))?;
        return Ok(Credential::with_private(pk).with_certificates(contents.certificates));
    }

    let public = contents
        .certificates
        .iter()
        .find_map(|der| rsa_public_from_certificate(der).ok());
    match public {
        Some(pk) => Ok(Credential::verify_only(pk).with_certificates(contents.certificates)),
        None => Err(Error::Key("PKCS#12 contains no usable RSA key".into())),
    }
}

/// Auto-detect a PEM credential format.
///
/// Tries encrypted PKCS#8 (when a password is given and the data looks
/// encrypted), then private key, public key, and certificate PEM.
pub fn load_pem_auto(pem_data: &[u8], password: Option<&str>) -> Result<Credential> {
    if let Some(pwd) = password {
        const MARKER: &[u8] = b"ENCRYPTED PRIVATE KEY";
        if pem_data.windows(MARKER.len()).any(|w| w == MARKER) {
            return load_encrypted_pem(pem_data, pwd);
        }
    }

    if let Ok(cred) = load_private_pem(pem_data) {
        return Ok(cred);
    }
    if let Ok(cred) = load_public_pem(pem_data) {
        return Ok(cred);
    }
    if let Ok(cred) = load_certificate_pem(pem_data) {
        return Ok(cred);
    }
    Err(Error::Key(
        "unable to auto-detect credential format from PEM data".into(),
    ))
}

/// Load a credential from a file, auto-detecting the format.
///
/// `.p12`/`.pfx` files are PKCS#12 containers, `.crt`/`.cer` files are
/// certificates; everything else is sniffed as PEM and then tried as the
/// common DER layouts.
pub fn load_credential_file(
    path: &std::path::Path,
    password: Option<&str>,
) -> Result<Credential> {
    let data = std::fs::read(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext.eq_ignore_ascii_case("p12") || ext.eq_ignore_ascii_case("pfx") {
        return load_pkcs12(&data, password.unwrap_or(""));
    }

    if ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer") {
        if data.starts_with(b"-----BEGIN") {
            return load_certificate_pem(&data);
        }
        return load_certificate_der(&data);
    }

    if data.starts_with(b"-----BEGIN") {
        return load_pem_auto(&data, password);
    }

    // DER fallbacks
    use pkcs8::DecodePrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(&data) {
        return Ok(Credential::with_private(pk));
    }

    use pkcs1::DecodeRsaPrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(&data) {
        return Ok(Credential::with_private(pk));
    }

    use spki::DecodePublicKey;
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(&data) {
        return Ok(Credential::verify_only(pk));
    }

    if let Ok(cred) = load_certificate_der(&data) {
        return Ok(cred);
    }

    Err(Error::Key(format!(
        "unable to auto-detect credential format from file: {}",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::{EncodePrivateKey, LineEnding};

    fn test_key() -> rsa::RsaPrivateKey {
        let mut rng = rand::thread_rng();
        rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap()
    }

    #[test]
    fn test_load_private_pem_pkcs8() {
        let key = test_key();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let cred = load_private_pem(pem.as_bytes()).unwrap();
        assert!(cred.has_private());
        assert_eq!(cred.public_key(), &key.to_public_key());
    }

    #[test]
    fn test_load_private_pem_pkcs1() {
        use pkcs1::EncodeRsaPrivateKey;
        let key = test_key();
        let pem = key.to_pkcs1_pem(LineEnding::LF).unwrap();
        let cred = load_private_pem(pem.as_bytes()).unwrap();
        assert_eq!(cred.public_key(), &key.to_public_key());
    }

    #[test]
    fn test_load_public_pem_spki() {
        use pkcs8::EncodePublicKey;
        let public = test_key().to_public_key();
        let pem = public.to_public_key_pem(LineEnding::LF).unwrap();
        let cred = load_public_pem(pem.as_bytes()).unwrap();
        assert!(!cred.has_private());
        assert_eq!(cred.public_key(), &public);
    }

    #[test]
    fn test_load_encrypted_pem_round_trip() {
        let key = test_key();
        let mut rng = rand::thread_rng();
        let pem = key
            .to_pkcs8_encrypted_pem(&mut rng, "senha123", LineEnding::LF)
            .unwrap();
        let cred = load_encrypted_pem(pem.as_bytes(), "senha123").unwrap();
        assert!(cred.has_private());
        assert_eq!(cred.public_key(), &key.to_public_key());
    }

    #[test]
    fn test_load_encrypted_pem_wrong_password() {
        let key = test_key();
        let mut rng = rand::thread_rng();
        let pem = key
            .to_pkcs8_encrypted_pem(&mut rng, "senha123", LineEnding::LF)
            .unwrap();
        assert!(load_encrypted_pem(pem.as_bytes(), "errada").is_err());
    }

    #[test]
    fn test_load_pem_auto_dispatch() {
        let key = test_key();
        let mut rng = rand::thread_rng();

        let plain = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let cred = load_pem_auto(plain.as_bytes(), None).unwrap();
        assert!(cred.has_private());

        let encrypted = key
            .to_pkcs8_encrypted_pem(&mut rng, "senha", LineEnding::LF)
            .unwrap();
        let cred = load_pem_auto(encrypted.as_bytes(), Some("senha")).unwrap();
        assert!(cred.has_private());

        // Encrypted data without a password cannot be loaded.
        assert!(load_pem_auto(encrypted.as_bytes(), None).is_err());
    }

    #[test]
    fn test_load_credential_file_pem() {
        let key = test_key();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chave.pem");
        std::fs::write(&path, pem.as_bytes()).unwrap();

        let cred = load_credential_file(&path, None).unwrap();
        assert_eq!(cred.public_key(), &key.to_public_key());
    }

    #[test]
    fn test_load_credential_file_der() {
        let key = test_key();
        let der = key.to_pkcs8_der().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chave.der");
        std::fs::write(&path, der.as_bytes()).unwrap();

        let cred = load_credential_file(&path, None).unwrap();
        assert_eq!(cred.public_key(), &key.to_public_key());
    }

    #[test]
    fn test_load_credential_file_missing() {
        let err = load_credential_file(std::path::Path::new("/nonexistent/chave.pem"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_a1_pfx() {
        let path = std::path::Path::new("../../test-data/certificado_a1.pfx");
        if !path.exists() {
            eprintln!("skipping test: {path:?} not found");
            return;
        }
        let cred = load_credential_file(path, Some("senha123")).expect("load A1 credential");
        assert!(cred.has_private());
        assert!(!cred.certificates.is_empty());
    }
}
