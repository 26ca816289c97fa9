//! C4 — token validation.
//!
//! Tokens are compared by SHA-256 digest under `subtle::ConstantTimeEq`
//! rather than by direct string equality, grounded in the teacher's
//! `ApiKeyStore::authenticate` (hash-then-compare, never branch on raw
//! key bytes). Hashing first also means every candidate is compared at a
//! fixed width, so timing can't leak which stored token (if any) a probe
//! is closest to.

use std::collections::HashSet;
use std::time::Duration;

use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

use crate::error::VaultError;
use crate::ratelimit::RateLimiter;

pub struct TokenValidator {
    token_digests: Vec<[u8; 32]>,
    rate_limiter: RateLimiter,
}

impl TokenValidator {
    pub fn new(tokens: HashSet<String>, max_requests: u32, window: Duration) -> Self {
        let token_digests = tokens.iter().map(|t| Sha256::digest(t.as_bytes()).into()).collect();
        Self { token_digests, rate_limiter: RateLimiter::new(max_requests, window) }
    }

    fn is_known_token(&self, token: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(token.as_bytes()).into();
        let mut found = Choice::from(0u8);
        for candidate in &self.token_digests {
            found |= candidate.ct_eq(&digest);
        }
        found.into()
    }

    /// C4 contract, checked in this order per spec: the rate limiter is
    /// consulted first (keyed by the raw token, valid or not), then token
    /// membership. Because the limiter keys its window per exact token
    /// string, a run of garbage tokens only ever exhausts its own
    /// (nonexistent) principal's bucket — it never touches another
    /// principal's quota (scenario S3).
    pub fn validate(&self, token: &str) -> Result<(), VaultError> {
        if !self.rate_limiter.is_allowed(token) {
            return Err(VaultError::RateLimited { retry_after_secs: self.rate_limiter.retry_after(token) });
        }
        if !self.is_known_token(token) {
            return Err(VaultError::Unauthenticated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_token_is_unauthenticated() {
        let validator = TokenValidator::new(tokens(&["good"]), 30, Duration::from_secs(60));
        assert!(matches!(validator.validate("bad"), Err(VaultError::Unauthenticated)));
    }

    #[test]
    fn known_token_validates() {
        let validator = TokenValidator::new(tokens(&["good"]), 30, Duration::from_secs(60));
        assert!(validator.validate("good").is_ok());
    }

    #[test]
    fn unauthenticated_probes_do_not_consume_other_principals_quota() {
        let validator = TokenValidator::new(tokens(&["good"]), 1, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(matches!(validator.validate("bad"), Err(VaultError::Unauthenticated)));
        }
        assert!(validator.validate("good").is_ok());
    }

    #[test]
    fn rate_limit_check_runs_before_token_membership_check() {
        let validator = TokenValidator::new(tokens(&["good"]), 1, Duration::from_secs(60));
        assert!(matches!(validator.validate("bad"), Err(VaultError::Unauthenticated)));
        assert!(matches!(validator.validate("bad"), Err(VaultError::RateLimited { .. })));
    }
}
