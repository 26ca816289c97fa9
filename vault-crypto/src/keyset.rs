//! On-disk keyset files: `EncKey`, `EvalKey`, `MetadataKey`, `SecKey`.
//!
//! Filenames are load-bearing (SPEC_FULL.md §6.4) — the public-bundle
//! response uses them verbatim as JSON keys, so this module must never
//! rename them.

use std::fs;
use std::path::{Path, PathBuf};

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::kem;

const ENC_KEY_FILE: &str = "EncKey";
const EVAL_KEY_FILE: &str = "EvalKey";
const METADATA_KEY_FILE: &str = "MetadataKey";
const SEC_KEY_FILE: &str = "SecKey";

#[derive(Serialize, Deserialize)]
struct EncKeyFile {
    version: u32,
    key_id: String,
    dim: u32,
    public_key_hex: String,
}

#[derive(Serialize, Deserialize)]
struct EvalKeyFile {
    version: u32,
    key_id: String,
    dim: u32,
    /// Opaque evaluation-parameter material. The spec treats evaluation
    /// keys as belonging entirely to the (out-of-scope) FHE library; this
    /// adapter never reads this field back, it only generates and serves it.
    eval_seed_hex: String,
}

#[derive(Serialize, Deserialize)]
struct SecKeyFile {
    version: u32,
    key_id: String,
    dim: u32,
    secret_key_hex: String,
}

#[derive(Serialize, Deserialize)]
struct MetadataKeyFile {
    version: u32,
    key_hex: String,
}

/// Resolved paths for a keyset directory. Process-constant after startup.
#[derive(Clone, Debug)]
pub struct KeyPaths {
    dir: PathBuf,
}

impl KeyPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn enc_key(&self) -> PathBuf {
        self.dir.join(ENC_KEY_FILE)
    }

    pub fn eval_key(&self) -> PathBuf {
        self.dir.join(EVAL_KEY_FILE)
    }

    pub fn metadata_key(&self) -> PathBuf {
        self.dir.join(METADATA_KEY_FILE)
    }

    pub fn sec_key(&self) -> PathBuf {
        self.dir.join(SEC_KEY_FILE)
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), CryptoError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), CryptoError> {
    Ok(())
}

/// Startup contract (SPEC_FULL.md §4.1): if `EncKey` is missing, generate
/// the full four-file set atomically; if present, assume the rest are too
/// and do not regenerate.
pub fn generate_keyset_if_missing(paths: &KeyPaths, key_id: &str, dim: u32) -> Result<(), CryptoError> {
    if paths.enc_key().exists() {
        return Ok(());
    }

    fs::create_dir_all(&paths.dir)?;

    let (pk, sk) = kem::keygen();

    let mut eval_seed = [0u8; 32];
    OsRng.fill_bytes(&mut eval_seed);

    let mut metadata_key = [0u8; 32];
    OsRng.fill_bytes(&mut metadata_key);

    let enc_file = EncKeyFile {
        version: 1,
        key_id: key_id.to_string(),
        dim,
        public_key_hex: hex::encode(pk.to_bytes()),
    };
    let eval_file = EvalKeyFile {
        version: 1,
        key_id: key_id.to_string(),
        dim,
        eval_seed_hex: hex::encode(eval_seed),
    };
    let mut sk_bytes = sk.to_bytes();
    let sec_file = SecKeyFile {
        version: 1,
        key_id: key_id.to_string(),
        dim,
        secret_key_hex: hex::encode(sk_bytes),
    };
    let metadata_file = MetadataKeyFile {
        version: 1,
        key_hex: hex::encode(metadata_key),
    };

    write_json(&paths.enc_key(), &enc_file)?;
    write_json(&paths.eval_key(), &eval_file)?;
    write_json(&paths.sec_key(), &sec_file)?;
    write_json(&paths.metadata_key(), &metadata_file)?;

    restrict_to_owner(&paths.sec_key())?;
    restrict_to_owner(&paths.metadata_key())?;

    sk_bytes.zeroize();
    eval_seed.zeroize();
    metadata_key.zeroize();
    drop(sk);

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CryptoError> {
    let json = serde_json::to_string_pretty(value).map_err(|_| CryptoError::Io)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_public_key(paths: &KeyPaths) -> Result<kem::PublicKey, CryptoError> {
    let raw = fs::read_to_string(paths.enc_key()).map_err(|_| CryptoError::KeyUnavailable)?;
    let file: EncKeyFile = serde_json::from_str(&raw).map_err(|_| CryptoError::Deserialization)?;
    let bytes = hex::decode(file.public_key_hex).map_err(|_| CryptoError::Deserialization)?;
    kem::PublicKey::from_bytes(&bytes)
}

pub fn read_secret_key(paths: &KeyPaths) -> Result<kem::SecretKey, CryptoError> {
    let raw = fs::read_to_string(paths.sec_key()).map_err(|_| CryptoError::KeyUnavailable)?;
    let file: SecKeyFile = serde_json::from_str(&raw).map_err(|_| CryptoError::Deserialization)?;
    let bytes = hex::decode(file.secret_key_hex).map_err(|_| CryptoError::Deserialization)?;
    kem::SecretKey::from_bytes(&bytes)
}

pub fn read_metadata_key(paths: &KeyPaths) -> Result<[u8; 32], CryptoError> {
    let raw = fs::read_to_string(paths.metadata_key()).map_err(|_| CryptoError::KeyUnavailable)?;
    let file: MetadataKeyFile = serde_json::from_str(&raw).map_err(|_| CryptoError::Deserialization)?;
    let bytes = hex::decode(file.key_hex).map_err(|_| CryptoError::Deserialization)?;
    bytes.try_into().map_err(|_| CryptoError::Deserialization)
}

/// Reads a keyset file as an opaque UTF-8 string, for the public bundle
/// response (§4.1 Read contract). Returns `Ok(None)` — rather than an
/// error — when the file is missing, so callers can silently omit it
/// (SPEC_FULL.md §9, open question 1).
pub fn read_public_bundle_entry(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}
