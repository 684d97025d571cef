//! Per-tick execution context provided to vehicle step functions.

use ecloud_core::types::{Command, VehicleState};

/// Context provided to a vehicle's step function on each received tick.
///
/// The step function inspects `tick_id`/`command`/`waypoints`, does whatever
/// driving-logic work it represents, and records its outcome via
/// [`VehicleContext::report`] before returning.
#[derive(Debug)]
pub struct VehicleContext {
    /// The tick id this push concerns.
    pub tick_id: u32,
    /// The command conveyed by this push (`Tick`, `End`, or scenario-defined).
    pub command: Command,
    /// Waypoint buffer fetched from the coordinator this tick, non-empty
    /// only in edge mode.
    pub waypoints: Vec<u8>,
    state: VehicleState,
    raw: Vec<u8>,
}

impl VehicleContext {
    #[must_use]
    pub(crate) fn new(tick_id: u32, command: Command, waypoints: Vec<u8>) -> Self {
        Self {
            tick_id,
            command,
            waypoints,
            state: VehicleState::TickOk,
            raw: Vec::new(),
        }
    }

    /// Record the outcome of this tick's driving step. `state` is usually
    /// [`VehicleState::TickOk`]; a vehicle with no more work for the rest of
    /// the scenario reports [`VehicleState::TickDone`] instead.
    pub fn report(&mut self, state: VehicleState, raw: Vec<u8>) {
        self.state = state;
        self.raw = raw;
    }

    pub(crate) fn into_outcome(self) -> (VehicleState, Vec<u8>) {
        (self.state, self.raw)
    }
}
