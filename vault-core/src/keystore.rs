//! C1 — the on-disk keyset: startup generation and the public bundle read
//! path. Thin orchestration over `vault-crypto`'s `keyset` module; this
//! layer owns the process-lifetime `CipherHandle` and the optional
//! `index_name` the spec's public bundle may carry (§4.1, §9 open
//! question 1).

use std::path::PathBuf;
use std::sync::Arc;

use vault_crypto::{read_public_bundle_entry, CipherHandle, CryptoProvider, KeyPaths};

use crate::error::VaultError;

pub struct KeyStore {
    paths: KeyPaths,
    dim: u32,
    index_name: Option<String>,
    cipher: Arc<CipherHandle>,
}

impl KeyStore {
    /// Startup contract: generate the keyset if `EncKey` is absent, then
    /// load the public key into a process-lifetime cipher handle shared by
    /// every request.
    pub fn bootstrap(
        provider: &dyn CryptoProvider,
        dir: impl Into<PathBuf>,
        key_id: &str,
        dim: u32,
        index_name: Option<String>,
    ) -> Result<Self, VaultError> {
        let dir = dir.into();
        provider
            .generate_keyset(&dir, key_id, dim)
            .map_err(|e| VaultError::Internal(format!("keyset bootstrap failed: {e}")))?;

        let paths = KeyPaths::new(dir);
        let cipher = provider
            .new_cipher(&paths.enc_key(), dim)
            .map_err(|e| VaultError::Internal(format!("failed to load public key: {e}")))?;

        Ok(Self { paths, dim, index_name, cipher: Arc::new(cipher) })
    }

    pub fn paths(&self) -> &KeyPaths {
        &self.paths
    }

    pub fn cipher(&self) -> &Arc<CipherHandle> {
        &self.cipher
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// C1 read contract for `get_public_key`: assembles `{EncKey, EvalKey,
    /// index_name?}`, silently omitting any entry whose backing file is
    /// missing rather than failing the whole bundle.
    pub fn public_bundle_json(&self) -> String {
        let mut bundle = serde_json::Map::new();

        if let Some(enc_key) = read_public_bundle_entry(&self.paths.enc_key()) {
            bundle.insert("EncKey".to_string(), serde_json::Value::String(enc_key));
        }
        if let Some(eval_key) = read_public_bundle_entry(&self.paths.eval_key()) {
            bundle.insert("EvalKey".to_string(), serde_json::Value::String(eval_key));
        }
        if let Some(index_name) = &self.index_name {
            bundle.insert("index_name".to_string(), serde_json::Value::String(index_name.clone()));
        }

        serde_json::Value::Object(bundle).to_string()
    }

    pub fn has_metadata_key(&self) -> bool {
        self.paths.metadata_key().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_crypto::HybridCryptoProvider;

    #[test]
    fn bootstrap_generates_keyset_and_public_bundle_has_exact_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::bootstrap(&HybridCryptoProvider, dir.path(), "vault-key", 8, None).unwrap();

        let bundle: serde_json::Value = serde_json::from_str(&store.public_bundle_json()).unwrap();
        let obj = bundle.as_object().unwrap();
        assert_eq!(obj.keys().collect::<std::collections::HashSet<_>>(), std::collections::HashSet::from([&"EncKey".to_string(), &"EvalKey".to_string()]));
    }

    #[test]
    fn public_bundle_includes_index_name_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::bootstrap(&HybridCryptoProvider, dir.path(), "vault-key", 8, Some("prod-index".to_string())).unwrap();

        let bundle: serde_json::Value = serde_json::from_str(&store.public_bundle_json()).unwrap();
        assert_eq!(bundle["index_name"], "prod-index");
    }

    #[test]
    fn bootstrap_is_idempotent_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let first = KeyStore::bootstrap(&HybridCryptoProvider, dir.path(), "vault-key", 8, None).unwrap();
        let second = KeyStore::bootstrap(&HybridCryptoProvider, dir.path(), "vault-key", 8, None).unwrap();
        assert_eq!(first.public_bundle_json(), second.public_bundle_json());
    }
}
