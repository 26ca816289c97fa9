//! C6 — batch metadata decryption. Short-circuits on the first failure
//! (a partial result would be ambiguous to a caller matching metadata back
//! to the vectors it annotates), and fails closed if `MetadataKey` was
//! never provisioned.

use std::path::Path;

use vault_crypto::CryptoProvider;

use crate::error::VaultError;

pub fn decrypt_metadata(
    provider: &dyn CryptoProvider,
    metadata_key_path: &Path,
    has_metadata_key: bool,
    encrypted_metadata_list: &[String],
) -> String {
    if !has_metadata_key {
        return VaultError::MissingMetadataKey.to_soft_error_json();
    }

    let mut plaintexts = Vec::with_capacity(encrypted_metadata_list.len());
    for token in encrypted_metadata_list {
        match provider.aes_decrypt_metadata(token, metadata_key_path) {
            Ok(value) => plaintexts.push(value),
            Err(e) => return VaultError::DecryptionFailed(e.to_string()).to_soft_error_json(),
        }
    }

    serde_json::to_string(&plaintexts).unwrap_or_else(|_| VaultError::Internal("response serialization failed".to_string()).to_soft_error_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_crypto::{seal_metadata, HybridCryptoProvider, KeyPaths};

    #[test]
    fn decrypts_heterogeneous_metadata_batch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = HybridCryptoProvider;
        provider.generate_keyset(dir.path(), "vault-key", 4).unwrap();
        let paths = KeyPaths::new(dir.path());
        let key = vault_crypto::read_metadata_key(&paths).unwrap();

        let a = seal_metadata(&key, &serde_json::json!({"doc": "one"})).unwrap();
        let b = seal_metadata(&key, &serde_json::json!("plain string")).unwrap();

        let json = decrypt_metadata(&provider, &paths.metadata_key(), true, &[a, b]);
        let values: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(values[0], serde_json::json!({"doc": "one"}));
        assert_eq!(values[1], serde_json::json!("plain string"));
    }

    #[test]
    fn missing_metadata_key_is_a_soft_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = HybridCryptoProvider;
        let paths = KeyPaths::new(dir.path());
        let json = decrypt_metadata(&provider, &paths.metadata_key(), false, &[]);
        assert_eq!(json, r#"{"error":"MetadataKey not found in Vault"}"#);
    }

    #[test]
    fn batch_short_circuits_on_first_undecryptable_entry() {
        let dir = tempfile::tempdir().unwrap();
        let provider = HybridCryptoProvider;
        provider.generate_keyset(dir.path(), "vault-key", 4).unwrap();
        let paths = KeyPaths::new(dir.path());
        let key = vault_crypto::read_metadata_key(&paths).unwrap();
        let good = seal_metadata(&key, &serde_json::json!("ok")).unwrap();

        let json = decrypt_metadata(&provider, &paths.metadata_key(), true, &[good, "not-a-valid-token".to_string()]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("Decryption failed"));
    }
}
