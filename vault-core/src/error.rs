//! `VaultError` — the seven error kinds of SPEC_FULL.md §7, with the
//! thrown-vs-soft-error asymmetry expressed as a single method
//! (`is_thrown`) rather than duplicated per transport.

use std::fmt;

#[derive(Debug, Clone)]
pub enum VaultError {
    Unauthenticated,
    RateLimited { retry_after_secs: u64 },
    PolicyViolation(String),
    Deserialization(String),
    DecryptionFailed(String),
    MissingMetadataKey,
    Internal(String),
}

/// What a dispatched operation resolves to, once `VaultError::into_response`
/// has applied the thrown-vs-soft-error policy. `Json` covers both genuine
/// successes and soft errors — both are a JSON string returned with
/// success transport status; `Thrown` is the transport-level error path.
pub enum Outcome {
    Thrown(VaultError),
    Json(String),
}

impl VaultError {
    /// Authentication, rate-limit, and internal failures are thrown
    /// (transport-level error); everything else is a soft error returned
    /// as a well-formed `{error}` JSON object with success transport status.
    pub fn is_thrown(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RateLimited { .. } | Self::Internal(_))
    }

    /// The message placed in a soft error's `{error: ...}` envelope, or
    /// in a thrown error's transport-level message.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthenticated => "Access Denied: Invalid Authentication Token".to_string(),
            Self::RateLimited { retry_after_secs } => {
                format!("Rate limit exceeded. Retry after {retry_after_secs}s")
            }
            Self::PolicyViolation(msg) => msg.clone(),
            Self::Deserialization(detail) => format!("Deserialization failed: {detail}"),
            Self::DecryptionFailed(detail) => format!("Decryption failed: {detail}"),
            Self::MissingMetadataKey => "MetadataKey not found in Vault".to_string(),
            Self::Internal(detail) => detail.clone(),
        }
    }

    /// Renders a non-thrown variant as the canonical `{"error": "..."}`
    /// JSON envelope. Panics if called on a thrown variant — callers must
    /// branch on `is_thrown` first; this asymmetry is the whole point of
    /// the error design and must never be fudged at the call site.
    pub fn to_soft_error_json(&self) -> String {
        debug_assert!(!self.is_thrown(), "thrown errors must not be rendered as soft errors");
        serde_json::json!({ "error": self.message() }).to_string()
    }

    /// The one place that decides thrown-vs-soft-error and bumps the
    /// request counter for the error path. Callers still own the duration
    /// histogram, since this has no way to know when the request started.
    pub fn into_response(self, method: &'static str, transport: &'static str) -> Outcome {
        metrics::counter!("vault_requests_total", "method" => method, "transport" => transport, "status" => "error").increment(1);
        if self.is_thrown() {
            Outcome::Thrown(self)
        } else {
            let json = self.to_soft_error_json();
            Outcome::Json(json)
        }
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for VaultError {}
