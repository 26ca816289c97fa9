//! C5 — the `decrypt_scores` pipeline: policy check, parse, decrypt,
//! bounded top-K selection.
//!
//! Top-K is a fixed-size min-heap rather than a full sort, so the engine
//! never materializes a fully sorted list of every decrypted score — only
//! the current best `top_k` are ever held at once. Ties (equal score)
//! break toward the lower `shard_idx`, then the lower `row_idx`, matching
//! spec invariant 3.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::Path;

use base64::Engine as _;
use vault_crypto::{CipherHandle, CryptoProvider};

use crate::error::VaultError;
use crate::types::ScoreEntry;

const MIN_TOP_K: i32 = 1;
const MAX_TOP_K: i32 = 10;

#[derive(Clone, Copy, Debug)]
struct RankedEntry {
    shard_idx: i64,
    row_idx: i64,
    score: f64,
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for RankedEntry {}
impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for RankedEntry {
    /// "Greater" means "ranks higher in the final output": higher score
    /// first, and among ties, lower `shard_idx` then lower `row_idx`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.shard_idx.cmp(&self.shard_idx))
            .then_with(|| other.row_idx.cmp(&self.row_idx))
    }
}

/// Runs the full `decrypt_scores` contract. `Ok` always carries a JSON
/// string — either a success array or a soft `{error: ...}` envelope;
/// validation of the token itself happens upstream in `C4` and is not
/// repeated here.
pub fn decrypt_scores(
    provider: &dyn CryptoProvider,
    handle: &CipherHandle,
    sec_key_path: &Path,
    encrypted_blob_b64: &str,
    top_k: i32,
) -> String {
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        return VaultError::PolicyViolation("Rate Limit Exceeded: Max top_k is 10".to_string()).to_soft_error_json();
    }

    let raw = match base64::engine::general_purpose::STANDARD.decode(encrypted_blob_b64) {
        Ok(raw) => raw,
        Err(e) => return VaultError::Deserialization(e.to_string()).to_soft_error_json(),
    };

    let parsed = match provider.ciphertext_score_parse(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return VaultError::Deserialization(e.to_string()).to_soft_error_json(),
    };

    let decrypted = match provider.decrypt_score(handle, &parsed, sec_key_path) {
        Ok(decrypted) => decrypted,
        Err(e) => return VaultError::DecryptionFailed(e.to_string()).to_soft_error_json(),
    };

    let mut heap: BinaryHeap<Reverse<RankedEntry>> = BinaryHeap::with_capacity(top_k as usize + 1);
    for (&shard_idx, row_scores) in decrypted.shard_idx.iter().zip(decrypted.score.iter()) {
        for (row_idx, &score) in row_scores.iter().enumerate() {
            let entry = RankedEntry { shard_idx, row_idx: row_idx as i64, score };
            if heap.len() < top_k as usize {
                heap.push(Reverse(entry));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if entry > *worst {
                    heap.pop();
                    heap.push(Reverse(entry));
                }
            }
        }
    }

    let mut ranked: Vec<RankedEntry> = heap.into_iter().map(|Reverse(e)| e).collect();
    ranked.sort_by(|a, b| b.cmp(a));

    let entries: Vec<ScoreEntry> = ranked
        .into_iter()
        .map(|e| ScoreEntry { shard_idx: e.shard_idx, row_idx: e.row_idx, score: e.score })
        .collect();

    serde_json::to_string(&entries).unwrap_or_else(|_| VaultError::Internal("response serialization failed".to_string()).to_soft_error_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_crypto::{seal_shard_scores, HybridCryptoProvider, KeyPaths};

    fn provider_and_handle(dir: &Path) -> (HybridCryptoProvider, CipherHandle, KeyPaths) {
        let provider = HybridCryptoProvider;
        provider.generate_keyset(dir, "vault-key", 4).unwrap();
        let paths = KeyPaths::new(dir);
        let handle = provider.new_cipher(&paths.enc_key(), 4).unwrap();
        (provider, handle, paths)
    }

    #[test]
    fn ranks_entries_descending_with_deterministic_ties() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, handle, paths) = provider_and_handle(dir.path());
        let pk = vault_crypto::read_public_key(&paths).unwrap();

        let sealed_0 = seal_shard_scores(&pk, 0, &[0.5, 0.9]).unwrap();
        let sealed_1 = seal_shard_scores(&pk, 1, &[0.9, 0.1]).unwrap();
        let blob = vault_proto::CiphertextScore {
            sealed_shard_scores: vec![sealed_0, sealed_1],
            shard_idx: vec![0, 1],
        };
        let blob_b64 = base64::engine::general_purpose::STANDARD.encode(prost::Message::encode_to_vec(&blob));

        let json = decrypt_scores(&provider, &handle, &paths.sec_key(), &blob_b64, 3);
        let entries: Vec<ScoreEntry> = serde_json::from_str(&json).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].score, 0.9);
        assert_eq!(entries[0].shard_idx, 0, "tie broken toward lower shard_idx");
        assert_eq!(entries[1].score, 0.9);
        assert_eq!(entries[1].shard_idx, 1);
        assert!(entries[1].score >= entries[2].score);
    }

    #[test]
    fn top_k_above_ten_is_a_soft_policy_violation() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, handle, paths) = provider_and_handle(dir.path());
        let json = decrypt_scores(&provider, &handle, &paths.sec_key(), "", 11);
        assert_eq!(json, r#"{"error":"Rate Limit Exceeded: Max top_k is 10"}"#);
    }

    #[test]
    fn malformed_base64_is_a_soft_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, handle, paths) = provider_and_handle(dir.path());
        let json = decrypt_scores(&provider, &handle, &paths.sec_key(), "not valid base64!!", 5);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("Deserialization failed"));
    }
}
