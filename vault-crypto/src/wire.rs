//! Envelope wire format (v1).
//!
//! Format:
//!   version[1] || suite_kem[1] || suite_aead[1] || flags[1] || kem_ct_len[2]
//!   || kem_ct[1120] || nonce[12] || aead_ct[16+]
//!
//! kem_ct = x25519_ephemeral_pk[32] || mlkem768_ciphertext[1088]

use crate::error::CryptoError;

/// Protocol identifier for KDF domain separation.
pub const PROTOCOL_ID: &[u8] = b"rune-vault-env-v1";

pub const PROTOCOL_VERSION: u8 = 0x01;

pub const SUITE_KEM_HYBRID_X25519_MLKEM768: u8 = 0xA3;
pub const SUITE_AEAD_AES256GCM: u8 = 0xB1;
pub const FLAGS_V1: u8 = 0x00;

pub const X25519_KEY_BYTES: usize = 32;
pub const MLKEM_CIPHERTEXT_BYTES: usize = 1088;
pub const MLKEM_PUBLIC_KEY_BYTES: usize = 1184;
pub const MLKEM_SECRET_KEY_BYTES: usize = 2400;

pub const KEM_CIPHERTEXT_BYTES: usize = X25519_KEY_BYTES + MLKEM_CIPHERTEXT_BYTES; // 1120
pub const KEM_PUBLIC_KEY_BYTES: usize = X25519_KEY_BYTES + MLKEM_PUBLIC_KEY_BYTES; // 1216
pub const KEM_SECRET_KEY_BYTES: usize = X25519_KEY_BYTES + MLKEM_SECRET_KEY_BYTES; // 2432

pub const SHARED_SECRET_BYTES: usize = 32;
pub const NONCE_BYTES: usize = 12;
pub const AEAD_TAG_BYTES: usize = 16;

pub const HEADER_BYTES: usize = 1 + 1 + 1 + 1 + 2; // 6
pub const MIN_CIPHERTEXT_BYTES: usize =
    HEADER_BYTES + KEM_CIPHERTEXT_BYTES + NONCE_BYTES + AEAD_TAG_BYTES; // 1154

#[derive(Debug, Clone, Copy)]
pub struct WireComponents<'a> {
    pub version: u8,
    pub suite_kem: u8,
    pub suite_aead: u8,
    pub flags: u8,
    pub kem_ciphertext: &'a [u8; KEM_CIPHERTEXT_BYTES],
    pub nonce: &'a [u8; NONCE_BYTES],
    pub aead_ciphertext: &'a [u8],
}

pub fn decode_wire(data: &[u8]) -> Result<WireComponents<'_>, CryptoError> {
    if data.len() < MIN_CIPHERTEXT_BYTES {
        return Err(CryptoError::DecryptionFailed);
    }

    let version = data[0];
    let suite_kem = data[1];
    let suite_aead = data[2];
    let flags = data[3];
    let kem_ct_len = u16::from_be_bytes([data[4], data[5]]);

    if version != PROTOCOL_VERSION
        || suite_kem != SUITE_KEM_HYBRID_X25519_MLKEM768
        || suite_aead != SUITE_AEAD_AES256GCM
        || flags != FLAGS_V1
        || kem_ct_len as usize != KEM_CIPHERTEXT_BYTES
    {
        return Err(CryptoError::DecryptionFailed);
    }

    let kem_start = HEADER_BYTES;
    let kem_end = kem_start + KEM_CIPHERTEXT_BYTES;
    let nonce_start = kem_end;
    let nonce_end = nonce_start + NONCE_BYTES;

    let kem_ciphertext: &[u8; KEM_CIPHERTEXT_BYTES] = data[kem_start..kem_end]
        .try_into()
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce: &[u8; NONCE_BYTES] = data[nonce_start..nonce_end]
        .try_into()
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let aead_ciphertext = &data[nonce_end..];
    if aead_ciphertext.len() < AEAD_TAG_BYTES {
        return Err(CryptoError::DecryptionFailed);
    }

    Ok(WireComponents {
        version,
        suite_kem,
        suite_aead,
        flags,
        kem_ciphertext,
        nonce,
        aead_ciphertext,
    })
}

pub fn encode_wire(kem_ct: &[u8], nonce: &[u8; NONCE_BYTES], aead_ct: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if kem_ct.len() != KEM_CIPHERTEXT_BYTES || aead_ct.len() < AEAD_TAG_BYTES {
        return Err(CryptoError::DecryptionFailed);
    }

    let mut out = Vec::with_capacity(HEADER_BYTES + KEM_CIPHERTEXT_BYTES + NONCE_BYTES + aead_ct.len());
    out.push(PROTOCOL_VERSION);
    out.push(SUITE_KEM_HYBRID_X25519_MLKEM768);
    out.push(SUITE_AEAD_AES256GCM);
    out.push(FLAGS_V1);
    out.extend_from_slice(&(KEM_CIPHERTEXT_BYTES as u16).to_be_bytes());
    out.extend_from_slice(kem_ct);
    out.extend_from_slice(nonce);
    out.extend_from_slice(aead_ct);

    Ok(out)
}
