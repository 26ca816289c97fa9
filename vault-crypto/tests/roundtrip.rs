//! Round-trip tests for the envelope machinery backing the Vault's
//! crypto provider adapter, grounded in the teacher's `tests/roundtrip.rs`.

use vault_crypto::{read_metadata_key, read_public_key, seal_shard_scores, CryptoProvider, HybridCryptoProvider, KeyPaths};
use vault_proto::CiphertextScore;

#[test]
fn generate_keyset_then_new_cipher_then_decrypt_score_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let provider = HybridCryptoProvider;

    provider.generate_keyset(dir.path(), "vault-key", 8).unwrap();

    let enc_key = KeyPaths::new(dir.path());
    let pk = read_public_key(&enc_key).unwrap();

    let scores_shard_0 = vec![0.1, 0.5, 0.3];
    let scores_shard_1 = vec![0.9, 0.2, 0.8];

    let sealed_0 = seal_shard_scores(&pk, 10, &scores_shard_0).unwrap();
    let sealed_1 = seal_shard_scores(&pk, 20, &scores_shard_1).unwrap();

    let parsed = CiphertextScore {
        sealed_shard_scores: vec![sealed_0, sealed_1],
        shard_idx: vec![10, 20],
    };

    let handle = provider.new_cipher(&enc_key.enc_key(), 8).unwrap();
    let decrypted = provider.decrypt_score(&handle, &parsed, &enc_key.sec_key()).unwrap();

    assert_eq!(decrypted.shard_idx, vec![10, 20]);
    assert_eq!(decrypted.score, vec![scores_shard_0, scores_shard_1]);
}

#[test]
fn missing_shard_idx_is_synthesized_as_0_n() {
    let dir = tempfile::tempdir().unwrap();
    let provider = HybridCryptoProvider;
    provider.generate_keyset(dir.path(), "vault-key", 4).unwrap();

    let paths = KeyPaths::new(dir.path());
    let pk = read_public_key(&paths).unwrap();

    let sealed = seal_shard_scores(&pk, 0, &[1.0, 2.0]).unwrap();
    let parsed = CiphertextScore {
        sealed_shard_scores: vec![sealed],
        shard_idx: vec![],
    };

    let handle = provider.new_cipher(&paths.enc_key(), 4).unwrap();
    let decrypted = provider.decrypt_score(&handle, &parsed, &paths.sec_key()).unwrap();

    assert_eq!(decrypted.shard_idx, vec![0]);
}

#[test]
fn ciphertext_score_parse_rejects_garbage_bytes() {
    let provider = HybridCryptoProvider;
    let err = provider.ciphertext_score_parse(b"not a protobuf message at all \xff\xfe").unwrap_err();
    assert_eq!(err, vault_crypto::CryptoError::Deserialization);
}

#[test]
fn metadata_seal_and_open_round_trips_heterogeneous_json() {
    let dir = tempfile::tempdir().unwrap();
    let provider = HybridCryptoProvider;
    provider.generate_keyset(dir.path(), "vault-key", 4).unwrap();

    let paths = KeyPaths::new(dir.path());
    let metadata_key = read_metadata_key(&paths).unwrap();

    let object_value = serde_json::json!({"a": 1});
    let string_value = serde_json::json!("hello");

    let token_a = vault_crypto::seal_metadata(&metadata_key, &object_value).unwrap();
    let token_b = vault_crypto::seal_metadata(&metadata_key, &string_value).unwrap();

    let decrypted_a = provider.aes_decrypt_metadata(&token_a, &paths.metadata_key()).unwrap();
    let decrypted_b = provider.aes_decrypt_metadata(&token_b, &paths.metadata_key()).unwrap();

    assert_eq!(decrypted_a, object_value);
    assert_eq!(decrypted_b, string_value);
}

#[test]
fn tampered_ciphertext_fails_to_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let provider = HybridCryptoProvider;
    provider.generate_keyset(dir.path(), "vault-key", 4).unwrap();

    let paths = KeyPaths::new(dir.path());
    let pk = read_public_key(&paths).unwrap();

    let mut sealed = seal_shard_scores(&pk, 0, &[1.0]).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0xFF;

    let parsed = CiphertextScore {
        sealed_shard_scores: vec![sealed],
        shard_idx: vec![0],
    };

    let handle = provider.new_cipher(&paths.enc_key(), 4).unwrap();
    let result = provider.decrypt_score(&handle, &parsed, &paths.sec_key());
    assert!(result.is_err());
}
