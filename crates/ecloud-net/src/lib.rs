//! NATS transport layer for the ecloud tick-synchronization coordinator.
//!
//! This crate provides:
//!
//! - [`subjects`] — NATS subject hierarchy constants and builders.
//! - [`messages`] — Wire message types and conversions to/from `ecloud_core`.
//! - [`codec`] — MessagePack serialisation/deserialisation helpers.
//! - [`connection`] — NATS connection management.
//! - [`pusher`] — the NATS-backed [`ecloud_core::Pusher`] implementation.
//! - [`serve`] — the request dispatcher wiring NATS subjects to a
//!   [`ecloud_core::Coordinator`].
//! - [`error`] — Network-layer error types.

pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;
pub mod pusher;
pub mod serve;
pub mod subjects;

pub use codec::{decode, encode};
pub use connection::NatsConnection;
pub use error::NetError;
pub use pusher::NatsPusher;
pub use serve::serve;
