//! Domain types shared by every coordinator component.
//!
//! These are transport-agnostic: [`crate::coordinator::Coordinator`] only
//! ever sees these shapes, never wire bytes. `ecloud-net` is responsible for
//! decoding/encoding them.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A tick-round command, passed through opaquely except for the two
/// well-known variants the coordinator itself branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Advance one simulation step.
    #[default]
    Tick,
    /// Terminal command: scenario has ended.
    End,
    /// A scenario-defined command the coordinator does not interpret.
    Other(i32),
}

impl Command {
    /// Decode from the wire's integer command code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Command::Tick,
            1 => Command::End,
            other => Command::Other(other),
        }
    }

    /// Encode to the wire's integer command code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Command::Tick => 0,
            Command::End => 1,
            Command::Other(c) => c,
        }
    }
}

/// Substate a vehicle reports on `Register` or `SendUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// First-contact registration: vehicle wants an index assigned.
    Registering,
    /// Second-phase registration: vehicle confirms its simulator-side actor.
    CarlaUpdate,
    /// Normal tick reply: the vehicle finished its step.
    TickOk,
    /// The vehicle has no more work for the remainder of the scenario.
    TickDone,
    /// An out-of-band debug payload, handled like `TickDone` for counting.
    DebugInfoUpdate,
}

/// A wall-clock timestamp, shaped like the wire's `{seconds, nanos}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Nanosecond remainder.
    pub nanos: i32,
}

impl Timestamp {
    /// Capture the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: d.as_secs() as i64,
            nanos: d.subsec_nanos() as i32,
        }
    }
}

/// A `host:port` peer address, following the coordinator's push-address
/// convention: `vehicle_machine_ip : ECLOUD_PUSH_BASE_PORT + index` for
/// vehicles, one well-known port for the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushAddr {
    /// Peer hostname or IP.
    pub host: String,
    /// Peer port.
    pub port: u16,
}

impl fmt::Display for PushAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One latency record produced per `TICK_OK` reply, cleared at the start of
/// each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRecord {
    /// Which vehicle this record belongs to.
    pub vehicle_index: usize,
    /// The simulator-supplied start time for this round.
    pub sm_start_tstamp: Timestamp,
    /// The vehicle's own reported processing start time.
    pub client_start_tstamp: Timestamp,
    /// The vehicle's own reported processing end time.
    pub client_end_tstamp: Timestamp,
    /// When the coordinator received this vehicle's reply.
    pub ecloud_rcv_tstamp: Timestamp,
    /// When the coordinator sent the round-complete push (filled in just
    /// before the push is issued, not at record-creation time).
    pub ecloud_snd_tstamp: Timestamp,
}

/// Info carried by `StartScenario`.
#[derive(Debug, Clone)]
pub struct StartScenarioInfo {
    /// Opaque scenario configuration payload (e.g. a YAML blob).
    pub scenario_config: String,
    /// Application name, echoed back to vehicles at registration.
    pub application: String,
    /// Application version, echoed back to vehicles at registration.
    pub version: String,
    /// Expected number of vehicles, `N`. Must be `<= MAX_CARS`.
    pub expected_vehicle_count: u16,
    /// Whether edge mode (centralized waypoint planning) is active.
    pub is_edge: bool,
    /// Host on which vehicle clients listen for pushes.
    pub vehicle_machine_addr: PushAddr,
    /// Vehicle index whose replies are always forwarded to the simulator,
    /// regardless of edge mode. Defaults to `0` (the spectator) — see
    /// `SPEC_FULL.md` §9.
    pub spectator_index: usize,
}

/// A `Register` request.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Human-readable container/display name.
    pub container_name: String,
    /// Which registration phase this is.
    pub vehicle_state: VehicleState,
    /// Simulator-side actor id (only meaningful for `CarlaUpdate`).
    pub actor_id: Option<String>,
    /// Simulator-side vehicle id (only meaningful for `CarlaUpdate`).
    pub vid: Option<String>,
    /// The index previously assigned (only meaningful for `CarlaUpdate`).
    pub vehicle_index: Option<usize>,
    /// Opaque serialized form of this request, stashed verbatim into
    /// `pending_replies` for `CarlaUpdate` registrations.
    pub raw: Vec<u8>,
}

/// The response to a `Register` request.
#[derive(Debug, Clone)]
pub struct RegistrationResponse {
    /// The vehicle's assigned (or echoed) index.
    pub vehicle_index: usize,
    /// The active scenario configuration payload.
    pub scenario_config: String,
    /// The active application name.
    pub application: String,
    /// The active application version.
    pub version: String,
}

/// A `SendUpdate` reply from a vehicle.
#[derive(Debug, Clone)]
pub struct VehicleReply {
    /// The reporting vehicle's index.
    pub vehicle_index: usize,
    /// The tick this reply is for.
    pub tick_id: u32,
    /// The vehicle's reported state.
    pub state: VehicleState,
    /// The vehicle's reported processing start time.
    pub client_start_tstamp: Timestamp,
    /// The vehicle's reported processing end time.
    pub client_end_tstamp: Timestamp,
    /// Opaque serialized form of this reply, stashed into `pending_replies`
    /// when the append policy (see `record_send_update`) applies.
    pub raw: Vec<u8>,
}

/// The message pushed to a peer (vehicle or simulator) carrying tick
/// progress. Mirrors the wire's single `Tick` message shape, which carries
/// either a round-start timestamp or a completed round's timestamp vector,
/// never both.
#[derive(Debug, Clone, Default)]
pub struct PushTick {
    /// The tick id this push concerns. Note: per `SPEC_FULL.md` §4.4, pushes
    /// to the simulator always carry the literal placeholder `1` here,
    /// regardless of the real tick counter — preserved verbatim for wire
    /// compatibility. Pushes to vehicles carry the real tick id.
    pub tick_id: u32,
    /// The command this tick conveys.
    pub command: Command,
    /// Set on vehicle-directed pushes and on the registration-complete
    /// push to the simulator.
    pub sm_start_tstamp: Option<Timestamp>,
    /// Set on the round-complete push to the simulator; empty otherwise.
    pub timestamps: Vec<TimestampRecord>,
}

/// A snapshot of one vehicle's planned waypoints, as pushed by
/// `PushEdgeWaypoints`.
#[derive(Debug, Clone)]
pub struct EdgeWaypointEntry {
    /// Which vehicle this plan is for.
    pub vehicle_index: usize,
    /// Opaque serialized waypoint buffer.
    pub buffer: Vec<u8>,
}
