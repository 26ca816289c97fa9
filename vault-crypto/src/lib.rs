//! Crypto provider adapter (C2) backing the Vault's opaque FHE-shaped
//! interface: key generation/storage, envelope sealing/opening, and the
//! `CiphertextScore` parse step.
//!
//! ## What's real, what's opaque
//!
//! - **Real:** hybrid X25519 + ML-KEM-768 key agreement, HKDF-SHA256 key
//!   derivation, AES-256-GCM authenticated encryption, a versioned wire
//!   format. This is the exact machinery a client or cloud index would
//!   need to implement to produce `CiphertextScore` blobs this Vault can
//!   decrypt.
//! - **Opaque by design:** there is no actual homomorphic scoring here —
//!   that computation happens upstream, on the untrusted cloud index,
//!   over ciphertexts this crate never sees in plaintext form. This crate
//!   only ever *opens* already-produced ciphertexts; it never performs
//!   homomorphic arithmetic.

mod aead;
mod error;
mod kdf;
mod kem;
mod keyset;
mod provider;
mod wire;

pub use error::CryptoError;
pub use kem::PublicKey;
pub use keyset::KeyPaths;
pub use provider::{seal_metadata, seal_shard_scores, CipherHandle, CryptoProvider, DecryptedScores, HybridCryptoProvider};

// Re-exported for callers that need to read key files directly (the
// Vault core's KeyStore reads `EncKey`/`EvalKey` as opaque bundle strings
// without going through the provider trait at all) and for test fixtures
// that need to seal data the same way a client would.
pub use keyset::{generate_keyset_if_missing, read_metadata_key, read_public_bundle_entry, read_public_key};
