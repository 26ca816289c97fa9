//! The narrow Crypto Provider interface (C2) the Vault core depends on.
//!
//! This is the one seam in the whole system where "an opaque FHE
//! library" becomes "the hybrid envelope primitives actually compiled
//! into this crate." Everything above `CryptoProvider` talks only in
//! terms of this trait.

use std::path::Path;

use base64::Engine as _;
use prost::Message;

use crate::error::CryptoError;
use crate::kem;
use crate::keyset::{self, KeyPaths};
use crate::{aead, kdf, wire};

/// Logical result of decrypting a `CiphertextScore`: a ragged 2-D score
/// matrix plus the shard identifiers for its outer rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedScores {
    pub score: Vec<Vec<f64>>,
    pub shard_idx: Vec<i64>,
}

/// A loaded public-key cipher context, created once at startup by
/// `new_cipher` and shared (behind an `Arc`) by every request handler.
pub struct CipherHandle {
    enc_key: kem::PublicKey,
    dim: u32,
}

impl CipherHandle {
    pub fn dim(&self) -> u32 {
        self.dim
    }
}

pub trait CryptoProvider: Send + Sync {
    fn generate_keyset(&self, dir: &Path, key_id: &str, dim: u32) -> Result<(), CryptoError>;
    fn new_cipher(&self, enc_key_path: &Path, dim: u32) -> Result<CipherHandle, CryptoError>;
    fn decrypt_score(&self, handle: &CipherHandle, parsed: &vault_proto::CiphertextScore, sec_key_path: &Path) -> Result<DecryptedScores, CryptoError>;
    fn aes_decrypt_metadata(&self, token_b64: &str, metadata_key_path: &Path) -> Result<serde_json::Value, CryptoError>;
    fn ciphertext_score_parse(&self, bytes: &[u8]) -> Result<vault_proto::CiphertextScore, CryptoError>;
}

/// Seals a plaintext score vector for one shard under `enc_key`, for use
/// by tests and by anything producing `CiphertextScore` fixtures. Not
/// part of the `CryptoProvider` interface — the Vault itself never seals,
/// only opens — but grounded in the same envelope machinery so
/// round-trip tests exercise exactly what production decryption exercises.
pub fn seal_shard_scores(enc_key: &kem::PublicKey, shard_idx: i64, scores: &[f64]) -> Result<Vec<u8>, CryptoError> {
    let mut plaintext = Vec::with_capacity(scores.len() * 8);
    for s in scores {
        plaintext.extend_from_slice(&s.to_le_bytes());
    }

    let (shared_secret, kem_ct) = kem::encapsulate(enc_key)?;
    let hash = kdf::ct_hash(&kem_ct);
    let context = shard_context(shard_idx);
    let key = kdf::derive_key(&shared_secret, &hash, &context)?;
    let nonce = aead::nonce()?;
    let aead_ct = aead::aead_seal(&key, &nonce, &plaintext, SCORE_AAD)?;
    wire::encode_wire(&kem_ct, &nonce, &aead_ct)
}

const SCORE_AAD: &[u8] = b"vault-score";
const METADATA_AAD: &[u8] = b"vault-metadata";

fn shard_context(shard_idx: i64) -> Vec<u8> {
    format!("shard|{shard_idx}").into_bytes()
}

fn open_shard_scores(sec_key: &kem::SecretKey, shard_idx: i64, sealed: &[u8]) -> Result<Vec<f64>, CryptoError> {
    let parts = wire::decode_wire(sealed)?;
    let shared_secret = kem::decapsulate(sec_key, parts.kem_ciphertext)?;
    let hash = kdf::ct_hash(parts.kem_ciphertext);
    let context = shard_context(shard_idx);
    let key = kdf::derive_key(&shared_secret, &hash, &context)?;
    let plaintext = aead::aead_open(&key, parts.nonce, parts.aead_ciphertext, SCORE_AAD)?;

    if plaintext.len() % 8 != 0 {
        return Err(CryptoError::Deserialization);
    }
    Ok(plaintext
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunks_exact(8)")))
        .collect())
}

/// The concrete adapter: hybrid X25519 + ML-KEM-768 + AES-256-GCM
/// envelope encryption standing in for the spec's opaque FHE library
/// (SPEC_FULL.md §4.2). Stateless — every method takes owned/borrowed
/// inputs and touches no shared mutable state, so it satisfies the
/// spec's "must be safe to call concurrently" contract without an
/// internal lock.
#[derive(Default, Clone, Copy)]
pub struct HybridCryptoProvider;

impl CryptoProvider for HybridCryptoProvider {
    fn generate_keyset(&self, dir: &Path, key_id: &str, dim: u32) -> Result<(), CryptoError> {
        let paths = KeyPaths::new(dir);
        keyset::generate_keyset_if_missing(&paths, key_id, dim)
    }

    fn new_cipher(&self, enc_key_path: &Path, dim: u32) -> Result<CipherHandle, CryptoError> {
        let paths = KeyPaths::new(enc_key_path.parent().unwrap_or_else(|| Path::new(".")));
        let enc_key = keyset::read_public_key(&paths)?;
        Ok(CipherHandle { enc_key, dim })
    }

    fn decrypt_score(
        &self,
        handle: &CipherHandle,
        parsed: &vault_proto::CiphertextScore,
        sec_key_path: &Path,
    ) -> Result<DecryptedScores, CryptoError> {
        let _ = handle; // reserved for future use (e.g. verifying dim); handle exists per the spec interface
        let paths = KeyPaths::new(sec_key_path.parent().unwrap_or_else(|| Path::new(".")));
        let sec_key = keyset::read_secret_key(&paths)?;

        let shard_idx = if parsed.shard_idx.is_empty() {
            (0..parsed.sealed_shard_scores.len() as i64).collect::<Vec<_>>()
        } else {
            parsed.shard_idx.clone()
        };

        if shard_idx.len() != parsed.sealed_shard_scores.len() {
            return Err(CryptoError::Deserialization);
        }

        let mut score = Vec::with_capacity(parsed.sealed_shard_scores.len());
        for (idx, sealed) in shard_idx.iter().zip(parsed.sealed_shard_scores.iter()) {
            score.push(open_shard_scores(&sec_key, *idx, sealed)?);
        }

        Ok(DecryptedScores { score, shard_idx })
    }

    fn aes_decrypt_metadata(&self, token_b64: &str, metadata_key_path: &Path) -> Result<serde_json::Value, CryptoError> {
        let paths = KeyPaths::new(metadata_key_path.parent().unwrap_or_else(|| Path::new(".")));
        let key = keyset::read_metadata_key(&paths)?;

        let raw = base64::engine::general_purpose::STANDARD
            .decode(token_b64)
            .map_err(|_| CryptoError::Deserialization)?;

        if raw.len() < wire::NONCE_BYTES + wire::AEAD_TAG_BYTES {
            return Err(CryptoError::Deserialization);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(wire::NONCE_BYTES);
        let nonce: [u8; wire::NONCE_BYTES] = nonce_bytes.try_into().expect("split_at(NONCE_BYTES)");

        let plaintext = aead::aead_open(&key, &nonce, ciphertext, METADATA_AAD)?;
        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::Deserialization)
    }

    fn ciphertext_score_parse(&self, bytes: &[u8]) -> Result<vault_proto::CiphertextScore, CryptoError> {
        vault_proto::CiphertextScore::decode(bytes).map_err(|_| CryptoError::Deserialization)
    }
}

/// Seals a JSON plaintext value as a `MetadataKey`-encrypted token, for
/// tests and for any tooling that provisions metadata fixtures.
pub fn seal_metadata(key: &[u8; 32], value: &serde_json::Value) -> Result<String, CryptoError> {
    let plaintext = serde_json::to_vec(value).map_err(|_| CryptoError::Deserialization)?;
    let nonce = aead::nonce()?;
    let ciphertext = aead::aead_seal(key, &nonce, &plaintext, METADATA_AAD)?;

    let mut raw = Vec::with_capacity(nonce.len() + ciphertext.len());
    raw.extend_from_slice(&nonce);
    raw.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(raw))
}
