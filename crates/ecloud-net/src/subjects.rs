//! NATS subject hierarchy.
//!
//! NATS subjects stand in for the original's gRPC service methods and
//! per-vehicle ports: each vehicle and the simulator get an addressable
//! subject derived from the same `host:port`-shaped convention the original
//! uses, even though delivery runs over NATS request-reply rather than raw
//! sockets.

/// Root prefix for all coordinator NATS subjects.
pub const PREFIX: &str = "ecloud";

/// Well-known port the simulator listens on for pushes, kept as a named
/// constant exactly like the original's `#define ECLOUD_PUSH_API_PORT`.
pub const ECLOUD_PUSH_API_PORT: u16 = 50061;

/// Base port vehicles listen on for pushes; a vehicle's actual port is
/// `ECLOUD_PUSH_BASE_PORT + vehicle_index`, exactly like the original's
/// `#define ECLOUD_PUSH_BASE_PORT`.
pub const ECLOUD_PUSH_BASE_PORT: u16 = 50101;

// ── Inbound request subjects (simulator → coordinator) ──────────────────────

/// `StartScenario`.
pub const START_SCENARIO: &str = "ecloud.scenario.start";

/// `DoTick`.
pub const DO_TICK: &str = "ecloud.tick.do";

/// `GetVehicleUpdates`.
pub const GET_VEHICLE_UPDATES: &str = "ecloud.tick.updates";

/// `PushEdgeWaypoints`.
pub const PUSH_EDGE_WAYPOINTS: &str = "ecloud.waypoints.push";

/// `EndScenario`.
pub const END_SCENARIO: &str = "ecloud.scenario.end";

// ── Inbound request subjects (vehicle → coordinator) ────────────────────────

/// `Register`.
pub const REGISTER: &str = "ecloud.vehicle.register";

/// `SendUpdate`.
pub const SEND_UPDATE: &str = "ecloud.vehicle.update";

/// `GetWaypoints`.
pub const GET_WAYPOINTS: &str = "ecloud.vehicle.waypoints";

// ── Dynamic push subjects ────────────────────────────────────────────────────

/// Subject a vehicle at `vehicle_index` listens on for pushed ticks,
/// matching the original's `vehicle_machine_ip:ECLOUD_PUSH_BASE_PORT+index`
/// addressing.
///
/// `ecloud.push.vehicle.<index>`
#[must_use]
pub fn vehicle_push(vehicle_index: usize) -> String {
    format!("ecloud.push.vehicle.{vehicle_index}")
}

/// Subject the simulator listens on for pushed round/registration
/// completions.
pub const SIMULATOR_PUSH: &str = "ecloud.push.simulator";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_push_subject_is_indexed() {
        assert_eq!(vehicle_push(3), "ecloud.push.vehicle.3");
        assert_eq!(vehicle_push(0), "ecloud.push.vehicle.0");
    }

    #[test]
    fn ports_match_the_original_defines() {
        assert_eq!(ECLOUD_PUSH_API_PORT, 50061);
        assert_eq!(ECLOUD_PUSH_BASE_PORT, 50101);
    }
}
