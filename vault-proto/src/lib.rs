//! Generated wire types for the Vault trust-boundary service.
//!
//! `CiphertextScore` doubles as the tool-protocol blob format (base64 of its
//! `prost::Message` encoding) and the binary RPC payload shape, so both
//! transports agree on one schema.

pub mod v1 {
    tonic::include_proto!("rune.vault.v1");
}

pub use v1::*;
