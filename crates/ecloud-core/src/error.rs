//! Core error types.
//!
//! Protocol violations are fatal: they indicate a simulator/vehicle bug that
//! silent recovery would mask, so callers are expected to abort the process
//! rather than retry.

use thiserror::Error;

/// Errors raised by [`crate::coordinator::Coordinator`] request handlers.
#[derive(Debug, Error)]
pub enum CoordError {
    /// A vehicle tried to register beyond the scenario's expected count, or
    /// before a scenario was started.
    #[error("vehicle registration at capacity (expected_vehicle_count reached)")]
    Capacity,

    /// `StartScenario` was given an `expected_vehicle_count` above `MAX_CARS`.
    #[error("expected_vehicle_count {0} exceeds MAX_CARS ({max})", max = crate::MAX_CARS)]
    TooManyVehicles(u16),

    /// `DoTick` was called with a non-consecutive tick id.
    #[error("non-consecutive tick: expected {expected}, got {got}")]
    NonConsecutiveTick {
        /// The tick id the coordinator expected (`current + 1`).
        expected: u32,
        /// The tick id actually supplied.
        got: u32,
    },

    /// A `Register` or `SendUpdate` request carried a `VehicleState` that is
    /// not valid for that operation.
    #[error("unexpected vehicle state {0:?} for this operation")]
    UnknownVehicleState(crate::types::VehicleState),

    /// A vehicle attempted to register before `StartScenario` configured the
    /// scenario.
    #[error("registration received before StartScenario")]
    ScenarioNotStarted,

    /// A reply referenced a vehicle index outside `[0, N)`.
    #[error("vehicle index {0} out of range")]
    UnknownVehicle(usize),
}
