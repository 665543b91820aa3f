#![forbid(unsafe_code)]

//! PKCS#12 (.pfx/.p12) parsing for Brazilian A1 digital certificates.
//!
//! A1 files are BER-encoded PFX v3 containers (RFC 7292), so this uses
//! `yasna::parse_ber` rather than a strict-DER decoder. The MAC is checked
//! before anything is decrypted; a wrong password surfaces there.

use nftsign_core::{Error, Result};
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};

use crate::kdf;

// ── OID constants ────────────────────────────────────────────────────

// Content types (PKCS#7)
const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// Bag types (PKCS#12)
const OID_PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];

// Certificate type
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Encryption schemes
const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Hash / HMAC
const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

/// Contents extracted from an A1 container.
#[derive(Debug)]
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys (an A1 file carries one).
    pub private_keys: Vec<Vec<u8>>,
    /// DER-encoded X.509 certificates, leaf first in practice.
    pub certificates: Vec<Vec<u8>>,
}

#[derive(Debug)]
enum EncryptionAlgorithm {
    PbeSha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: kdf::Prf,
        iv: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy)]
enum MacHash {
    Sha1,
    Sha256,
}

struct MacData {
    hash: MacHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum SafeBag {
    ShroudedKey {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
    Certificate {
        der: Vec<u8>,
    },
    Other,
}

enum ContentInfo {
    Data(Vec<u8>),
    Encrypted {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
}

/// Parse a PKCS#12 container, decrypting with `password`.
pub fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents> {
    let (auth_safe, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            if version != 3 {
                return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
            }
            let auth_safe = read_data_content_info(r.next())?;
            let mac_data = r.read_optional(read_mac_data)?;
            Ok((auth_safe, mac_data))
        })
    })
    .map_err(|e| Error::Key(format!("failed to parse PKCS#12 PFX: {e}")))?;

    if let Some(ref mac) = mac_data {
        verify_mac(mac, &auth_safe, password)?;
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(read_content_info))
        .map_err(|e| Error::Key(format!("failed to parse authSafe contents: {e}")))?;

    let bmp_password = kdf::password_to_bmp(password);
    let mut contents = Pkcs12Contents {
        private_keys: Vec::new(),
        certificates: Vec::new(),
    };

    for ci in content_infos {
        let bags_der = match ci {
            ContentInfo::Data(data) => data,
            ContentInfo::Encrypted {
                algorithm,
                ciphertext,
            } => decrypt(&algorithm, &ciphertext, password, &bmp_password)?,
        };

        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| Error::Key(format!("failed to parse SafeBags: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey {
                    algorithm,
                    ciphertext,
                } => {
                    let pkcs8_der = decrypt(&algorithm, &ciphertext, password, &bmp_password)?;
                    contents.private_keys.push(pkcs8_der);
                }
                SafeBag::Certificate { der } => contents.certificates.push(der),
                SafeBag::Other => {}
            }
        }
    }

    Ok(contents)
}

// ── Structure readers ────────────────────────────────────────────────

/// ContentInfo with contentType = data; yields the OCTET STRING payload.
fn read_data_content_info(r: BERReader) -> std::result::Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type != oid(OID_DATA) {
            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

/// One ContentInfo inside the authSafe sequence: plain data or
/// password-encrypted data.
fn read_content_info(r: BERReader) -> std::result::Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;

        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            Ok(ContentInfo::Data(data))
        } else if content_type == oid(OID_ENCRYPTED_DATA) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        let _inner_type = r.next().read_oid()?;
                        let algorithm = read_algorithm_identifier(r.next())?;
                        // [0] IMPLICIT encrypted content
                        let ciphertext = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(ContentInfo::Encrypted {
                            algorithm,
                            ciphertext,
                        })
                    })
                })
            })
        } else {
            Err(ASN1Error::new(ASN1ErrorKind::Invalid))
        }
    })
}

fn read_safe_bag(r: BERReader) -> std::result::Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        let bag = if bag_type == oid(OID_PKCS8_SHROUDED_KEY_BAG) {
            // [0] EXPLICIT EncryptedPrivateKeyInfo
            let (algorithm, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let algorithm = read_algorithm_identifier(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((algorithm, ciphertext))
                })
            })?;
            SafeBag::ShroudedKey {
                algorithm,
                ciphertext,
            }
        } else if bag_type == oid(OID_CERT_BAG) {
            // [0] EXPLICIT CertBag
            let der = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    if cert_type != oid(OID_X509_CERTIFICATE) {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    // [0] EXPLICIT OCTET STRING with the certificate DER
                    r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                })
            })?;
            SafeBag::Certificate { der }
        } else {
            let _value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };

        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Read and discard the optional SET of bag attributes (friendlyName,
/// localKeyId and friends).
fn skip_bag_attributes(
    r: &mut yasna::BERReaderSeq<'_, '_>,
) -> std::result::Result<(), ASN1Error> {
    let _attrs = r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _oid = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    let _ = r.read_der()?;
                    Ok(())
                })?;
                Ok(())
            })
        })
    })?;
    Ok(())
}

fn read_algorithm_identifier(
    r: BERReader,
) -> std::result::Result<EncryptionAlgorithm, ASN1Error> {
    r.read_sequence(|r| {
        let alg_oid = r.next().read_oid()?;

        if alg_oid == oid(OID_PBE_SHA1_3DES) {
            // pkcs-12PbeParams: SEQUENCE { salt OCTET STRING, iterations INTEGER }
            r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(EncryptionAlgorithm::PbeSha1And3Des { salt, iterations })
            })
        } else if alg_oid == oid(OID_PBES2) {
            // PBES2-params: SEQUENCE { keyDerivationFunc, encryptionScheme }
            r.next().read_sequence(|r| {
                let (salt, iterations, prf) = r.next().read_sequence(|r| {
                    let kdf_oid = r.next().read_oid()?;
                    if kdf_oid != oid(OID_PBKDF2) {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    r.next().read_sequence(read_pbkdf2_params)
                })?;

                let iv = r.next().read_sequence(|r| {
                    let enc_oid = r.next().read_oid()?;
                    if enc_oid != oid(OID_AES_256_CBC) {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    r.next().read_bytes()
                })?;

                Ok(EncryptionAlgorithm::Pbes2 {
                    salt,
                    iterations,
                    prf,
                    iv,
                })
            })
        } else {
            Err(ASN1Error::new(ASN1ErrorKind::Invalid))
        }
    })
}

/// PBKDF2-params: SEQUENCE { salt, iterationCount, keyLength?, prf? }.
/// Both trailing fields are optional; the PRF defaults to HMAC-SHA1.
fn read_pbkdf2_params(
    r: &mut yasna::BERReaderSeq<'_, '_>,
) -> std::result::Result<(Vec<u8>, u32, kdf::Prf), ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;

    let mut prf = kdf::Prf::HmacSha1;
    if let Some(der) = r.read_optional(|r| r.read_der())? {
        if der.first() == Some(&0x30) {
            // SEQUENCE: this is the PRF AlgorithmIdentifier.
            prf = read_prf(&der)?;
        } else if let Some(prf_der) = r.read_optional(|r| r.read_der())? {
            // The first field was keyLength; the PRF may still follow.
            prf = read_prf(&prf_der)?;
        }
    }
    Ok((salt, iterations, prf))
}

fn read_prf(der: &[u8]) -> std::result::Result<kdf::Prf, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let prf_oid = r.next().read_oid()?;
            let _null = r.read_optional(|r| r.read_null())?;
            if prf_oid == oid(OID_HMAC_SHA256) {
                Ok(kdf::Prf::HmacSha256)
            } else if prf_oid == oid(OID_HMAC_SHA1) {
                Ok(kdf::Prf::HmacSha1)
            } else {
                Err(ASN1Error::new(ASN1ErrorKind::Invalid))
            }
        })
    })
}

// ── MAC verification ─────────────────────────────────────────────────

fn read_mac_data(r: BERReader) -> std::result::Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let hash_oid = r.next().read_oid()?;
                let _null = r.read_optional(|r| r.read_null())?;
                if hash_oid == oid(OID_SHA256) {
                    Ok(MacHash::Sha256)
                } else if hash_oid == oid(OID_SHA1) {
                    Ok(MacHash::Sha1)
                } else {
                    Err(ASN1Error::new(ASN1ErrorKind::Invalid))
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            hash,
            digest,
            salt,
            iterations,
        })
    })
}

fn verify_mac(mac: &MacData, auth_safe: &[u8], password: &str) -> Result<()> {
    let bmp_password = kdf::password_to_bmp(password);
    let computed = match mac.hash {
        MacHash::Sha1 => {
            let key = kdf::derive_sha1(kdf::ID_MAC, &bmp_password, &mac.salt, mac.iterations, 20);
            kdf::hmac_sha1(&key, auth_safe)
        }
        MacHash::Sha256 => {
            let key = kdf::derive_sha256(kdf::ID_MAC, &bmp_password, &mac.salt, mac.iterations, 32);
            kdf::hmac_sha256(&key, auth_safe)
        }
    };
    if computed != mac.digest {
        return Err(Error::Key(
            "PKCS#12 MAC verification failed (wrong password?)".into(),
        ));
    }
    Ok(())
}

fn decrypt(
    algorithm: &EncryptionAlgorithm,
    ciphertext: &[u8],
    password: &str,
    bmp_password: &[u8],
) -> Result<Vec<u8>> {
    match algorithm {
        EncryptionAlgorithm::PbeSha1And3Des { salt, iterations } => {
            kdf::decrypt_pbe_sha1_3des(ciphertext, bmp_password, salt, *iterations)
        }
        EncryptionAlgorithm::Pbes2 {
            salt,
            iterations,
            prf,
            iv,
        } => kdf::decrypt_pbes2_aes256cbc(ciphertext, password, salt, *iterations, iv, *prf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1_container() {
        let path = std::path::Path::new("../../test-data/certificado_a1.pfx");
        if !path.exists() {
            eprintln!("skipping test: {path:?} not found");
            return;
        }
        let data = std::fs::read(path).unwrap();
        let contents = parse_pfx(&data, "senha123").expect("parse_pfx should succeed");
        assert_eq!(contents.private_keys.len(), 1);
        assert!(!contents.certificates.is_empty());
        // PKCS#8 DER starts with a SEQUENCE tag.
        assert_eq!(contents.private_keys[0][0], 0x30);
    }

    #[test]
    fn test_wrong_password_fails_mac() {
        let path = std::path::Path::new("../../test-data/certificado_a1.pfx");
        if !path.exists() {
            eprintln!("skipping test: {path:?} not found");
            return;
        }
        let data = std::fs::read(path).unwrap();
        let err = parse_pfx(&data, "senha_errada").unwrap_err();
        assert!(err.to_string().contains("MAC verification failed"));
    }

    #[test]
    fn test_garbage_input_is_key_error() {
        let err = parse_pfx(b"not a pfx", "senha").unwrap_err();
        assert!(matches!(err, Error::Key(_)));
    }
}
