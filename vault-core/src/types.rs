//! Response shapes shared across transports.

use serde::{Deserialize, Serialize};

/// A single ranked result from `decrypt_scores`. The binary RPC transport
/// carries the protobuf twin of this (`vault_proto::ScoreEntry`); stdio and
/// HTTP carry this serialized as JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub shard_idx: i64,
    pub row_idx: i64,
    pub score: f64,
}
