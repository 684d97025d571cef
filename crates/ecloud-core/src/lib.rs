//! Transport-agnostic tick-synchronization core for the ecloud
//! simulation-orchestration coordinator.
//!
//! This crate knows nothing about NATS, gRPC, or MessagePack — it only
//! models the registration/tick/reply state machine and the synchronization
//! primitives that make it safe under concurrent access. `ecloud-net` wires
//! it to the wire protocol; `ecloud-coordinator` wires it to a process.

pub mod coordinator;
pub mod error;
pub mod pusher;
pub mod registry;
pub mod round;
pub mod scenario;
pub mod types;
pub mod waypoints;

pub use coordinator::Coordinator;
pub use error::CoordError;
pub use pusher::{PushError, Pusher};

/// Hard ceiling on vehicles in one scenario, matching the original's fixed
/// `MAX_CARS` array bound.
pub const MAX_CARS: usize = 512;
