//! Error types for the Vault crypto provider adapter.

use std::fmt;

/// Opaque decryption failure. Deliberately carries no detail beyond a
/// short machine-readable reason: callers must not be able to distinguish
/// "wrong key" from "tampered ciphertext" from "malformed input" by error
/// shape alone (oracle discipline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext too short, malformed header, or AEAD tag mismatch.
    DecryptionFailed,
    /// Input did not parse as the expected protobuf/JSON shape.
    Deserialization,
    /// A keyset file was missing or unreadable.
    KeyUnavailable,
    /// Filesystem or serialization error while generating/reading keys.
    Io,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecryptionFailed => write!(f, "decryption failed"),
            Self::Deserialization => write!(f, "deserialization failed"),
            Self::KeyUnavailable => write!(f, "key unavailable"),
            Self::Io => write!(f, "key store io error"),
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<std::io::Error> for CryptoError {
    fn from(_: std::io::Error) -> Self {
        Self::Io
    }
}
