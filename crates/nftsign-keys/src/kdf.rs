#![forbid(unsafe_code)]

//! Key derivation and decryption for PKCS#12 containers.
//!
//! A1 certificate files come in two generations: legacy
//! pbeWithSHAAnd3-KeyTripleDES-CBC (PKCS#12 KDF, RFC 7292 Appendix B) and
//! PBES2 with PBKDF2 + AES-256-CBC, the OpenSSL 3.x default.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::Hmac;
use nftsign_core::{Error, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// PKCS#12 KDF purpose IDs (RFC 7292 Appendix B.3).
pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// PRF choices for PBKDF2 inside PBES2.
#[derive(Debug, Clone, Copy)]
pub enum Prf {
    HmacSha1,
    HmacSha256,
}

/// PKCS#12 KDF over SHA-1 (u = 20, v = 64).
///
/// `password` must already be BMP-encoded (see [`password_to_bmp`]).
pub fn derive_sha1(id: u8, password: &[u8], salt: &[u8], iterations: u32, len: usize) -> Vec<u8> {
    derive_generic::<Sha1>(id, password, salt, iterations, len, 20, 64)
}

/// PKCS#12 KDF over SHA-256 (u = 32, v = 64).
pub fn derive_sha256(id: u8, password: &[u8], salt: &[u8], iterations: u32, len: usize) -> Vec<u8> {
    derive_generic::<Sha256>(id, password, salt, iterations, len, 32, 64)
}

fn derive_generic<D>(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
    u: usize,
    v: usize,
) -> Vec<u8>
where
    D: Digest + sha2::digest::FixedOutputReset,
{
    // D = id repeated v times; S and P are the salt and password repeated
    // to a multiple of v; I = S || P.
    let d_block = vec![id; v];
    let s = repeat_to_multiple(salt, v);
    let p = repeat_to_multiple(password, v);
    let mut i_block = Vec::with_capacity(s.len() + p.len());
    i_block.extend_from_slice(&s);
    i_block.extend_from_slice(&p);

    let blocks = len.div_ceil(u);
    let mut out = Vec::with_capacity(blocks * u);

    for block_idx in 0..blocks {
        // A = H^iterations(D || I)
        let mut hasher = D::new();
        Digest::update(&mut hasher, &d_block);
        Digest::update(&mut hasher, &i_block);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if block_idx + 1 < blocks {
            // I_j = (I_j + B + 1) mod 2^(v*8), with B = A repeated to v bytes
            let b = repeat_to_multiple(&a, v);
            for chunk in i_block.chunks_mut(v) {
                add_one_plus(chunk, &b);
            }
        }
    }

    out.truncate(len);
    out
}

/// Repeat `data` until the output length is the next multiple of `v`.
fn repeat_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let take = (len - out.len()).min(data.len());
        out.extend_from_slice(&data[..take]);
    }
    out
}

/// In-place (block + b + 1) mod 2^(len*8); `b` has the same length.
fn add_one_plus(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for k in (0..block.len()).rev() {
        let sum = block[k] as u16 + b[k] as u16 + carry;
        block[k] = sum as u8;
        carry = sum >> 8;
    }
}

/// BMP password encoding: UTF-16BE code units followed by two zero bytes.
/// The empty password encodes to the empty string, per RFC 7292.
pub fn password_to_bmp(password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut bmp = Vec::with_capacity(password.len() * 2 + 2);
    for unit in password.encode_utf16() {
        bmp.push((unit >> 8) as u8);
        bmp.push(unit as u8);
    }
    bmp.push(0);
    bmp.push(0);
    bmp
}

/// Legacy PBE decryption: PKCS#12 KDF (SHA-1) derives a 24-byte 3DES key
/// and 8-byte IV, then 3DES-CBC with PKCS#7 padding.
pub fn decrypt_pbe_sha1_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Vec<u8>> {
    let key = derive_sha1(ID_KEY, bmp_password, salt, iterations, 24);
    let iv = derive_sha1(ID_IV, bmp_password, salt, iterations, 8);

    let decryptor = Des3CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| Error::Key(format!("3DES-CBC init failed: {e}")))?;
    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| Error::Key(format!("3DES-CBC decrypt failed: {e}")))?;
    Ok(plaintext.to_vec())
}

/// PBES2 decryption: PBKDF2 (over the chosen PRF, UTF-8 password) derives
/// a 32-byte AES key, then AES-256-CBC with PKCS#7 padding.
pub fn decrypt_pbes2_aes256cbc(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
    prf: Prf,
) -> Result<Vec<u8>> {
    let mut key = [0u8; 32];
    match prf {
        Prf::HmacSha1 => {
            pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key)
        }
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key)
        }
    }

    let decryptor = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|e| Error::Key(format!("AES-256-CBC init failed: {e}")))?;
    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| Error::Key(format!("AES-256-CBC decrypt failed: {e}")))?;
    Ok(plaintext.to_vec())
}

pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::Mac;
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::Mac;
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
