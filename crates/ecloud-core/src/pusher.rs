//! The outbound half of the Transport Adapter (`SPEC_FULL.md` §4.1).
//!
//! The core never encodes bytes itself — it hands a [`PushTick`] to whatever
//! [`Pusher`] the registry has on file for a peer. `ecloud-net` supplies the
//! concrete (NATS-backed) implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PushTick;

/// A transport-level push failure. Always non-fatal to the round: the
/// caller logs and swallows it (`SPEC_FULL.md` §4.1, §7).
#[derive(Debug, Error)]
#[error("push failed: {0}")]
pub struct PushError(pub String);

/// A handle capable of delivering a [`PushTick`] to one peer (a vehicle or
/// the simulator).
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Deliver `msg`, awaiting the peer's acknowledgement.
    async fn push_tick(&self, msg: &PushTick) -> Result<(), PushError>;
}
