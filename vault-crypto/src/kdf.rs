//! Key derivation: ciphertext-hash domain separation + HKDF-SHA256.

use hkdf::Hkdf;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use crate::error::CryptoError;
use crate::wire::{PROTOCOL_ID, SHARED_SECRET_BYTES};

/// Binds the KEM ciphertext into the derived key so two different
/// encapsulations never collide even if the shared secret somehow did.
pub fn ct_hash(kem_ct: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(kem_ct);
    hasher.finalize().into()
}

/// Derives the AES-256 key from the combined KEM shared secret, the
/// ciphertext hash, and a caller-supplied domain-separation context.
pub fn derive_key(shared_secret: &[u8], ct_hash: &[u8; 32], context: &[u8]) -> Result<[u8; 32], CryptoError> {
    if shared_secret.len() != SHARED_SECRET_BYTES * 2 {
        return Err(CryptoError::DecryptionFailed);
    }

    let mut info = Vec::with_capacity(PROTOCOL_ID.len() + 5 + ct_hash.len() + context.len());
    info.extend_from_slice(PROTOCOL_ID);
    info.extend_from_slice(b"|aes|");
    info.extend_from_slice(ct_hash);
    info.extend_from_slice(context);

    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hk.expand(&info, &mut key).map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(key)
}
