//! The NATS-backed [`Pusher`] implementation.
//!
//! Pushes are modeled as NATS requests (not bare publishes) because a push
//! must await the peer's ack — the original's push sockets block until the
//! vehicle or simulator accepts the tick, and a fire-and-forget publish
//! would silently swallow that signal.

use async_trait::async_trait;
use ecloud_core::pusher::{PushError, Pusher};
use ecloud_core::types::PushTick;

use crate::connection::NatsConnection;
use crate::messages::{WireAck, WirePushTick};

/// Delivers ticks to one peer (a vehicle or the simulator) over a fixed
/// NATS subject.
pub struct NatsPusher {
    connection: NatsConnection,
    subject: String,
}

impl NatsPusher {
    /// Create a pusher that sends every [`PushTick`] to `subject`.
    #[must_use]
    pub fn new(connection: NatsConnection, subject: String) -> Self {
        Self { connection, subject }
    }
}

#[async_trait]
impl Pusher for NatsPusher {
    async fn push_tick(&self, msg: &PushTick) -> Result<(), PushError> {
        let wire = WirePushTick::from(msg);
        self.connection
            .request::<_, WireAck>(&self.subject, &wire)
            .await
            .map_err(|err| PushError(err.to_string()))?;
        Ok(())
    }
}
