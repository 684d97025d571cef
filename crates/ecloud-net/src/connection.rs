//! NATS connection management.
//!
//! A thin wrapper around `async-nats` with coordinator-specific defaults and
//! MessagePack-encoded request/publish helpers.

use tracing::info;

use crate::codec;
use crate::error::NetError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// The environment variable used to override the NATS URL.
pub const NATS_URL_ENV: &str = "NATS_URL";

/// A wrapper around an `async-nats` client with coordinator-specific
/// helpers.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    client: async_nats::Client,
}

impl NatsConnection {
    /// Connect to NATS using the URL from the `NATS_URL` environment
    /// variable, falling back to [`DEFAULT_NATS_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect() -> Result<Self, NetError> {
        let url = std::env::var(NATS_URL_ENV).unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
        Self::connect_to(&url).await
    }

    /// Connect to NATS at the specified URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str) -> Result<Self, NetError> {
        info!(url, "connecting to NATS");
        let client = async_nats::connect(url).await?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Returns a reference to the underlying `async-nats` client.
    #[must_use]
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Send a request-reply RPC to `subject`, awaiting the peer's response.
    /// This is the coordinator's stand-in for the original's gRPC unary
    /// call, and for pushes, which must await an ack rather than fire and
    /// forget.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding, the NATS request, or decoding the
    /// reply fails.
    pub async fn request<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        subject: &str,
        request: &Req,
    ) -> Result<Resp, NetError> {
        let payload = codec::encode(request)?;
        let message = self.client.request(subject.to_string(), payload.into()).await?;
        codec::decode(&message.payload)
    }

    /// Subscribe to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, NetError> {
        let sub = self.client.subscribe(subject.to_string()).await?;
        Ok(sub)
    }

    /// Publish a reply to a request's reply subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn reply<T: serde::Serialize>(
        &self,
        reply_subject: &str,
        message: &T,
    ) -> Result<(), NetError> {
        let payload = codec::encode(message)?;
        self.client
            .publish(reply_subject.to_string(), payload.into())
            .await?;
        Ok(())
    }
}
