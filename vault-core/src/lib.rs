//! Vault service core (C1, C3–C7): key store, rate limiter, token
//! validator, decryption engine, metadata batch decryption, and the
//! shared three-operation request handler. Transport-agnostic — the
//! stdio, HTTP, and binary RPC front ends in `vault-server` all drive
//! this same `VaultService`.

mod auth;
mod decrypt;
mod error;
mod handlers;
mod keystore;
mod metadata;
mod ratelimit;
mod types;

pub use auth::TokenValidator;
pub use error::{Outcome, VaultError};
pub use handlers::VaultService;
pub use keystore::KeyStore;
pub use ratelimit::RateLimiter;
pub use types::ScoreEntry;
