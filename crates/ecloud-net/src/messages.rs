//! Wire message types exchanged between simulator, vehicles, and the
//! coordinator, plus their conversions to/from `ecloud_core`'s
//! transport-agnostic domain types.
//!
//! All types derive `Serialize`/`Deserialize` for named MessagePack
//! transport (`crate::codec`).

use ecloud_core::types::{
    Command, EdgeWaypointEntry, PushAddr, PushTick, RegistrationRequest, RegistrationResponse,
    StartScenarioInfo, Timestamp, TimestampRecord, VehicleReply, VehicleState,
};
use serde::{Deserialize, Serialize};

/// Wire shape of [`Timestamp`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl From<Timestamp> for WireTimestamp {
    fn from(t: Timestamp) -> Self {
        Self {
            seconds: t.seconds,
            nanos: t.nanos,
        }
    }
}

impl From<WireTimestamp> for Timestamp {
    fn from(t: WireTimestamp) -> Self {
        Self {
            seconds: t.seconds,
            nanos: t.nanos,
        }
    }
}

/// Wire shape of [`TimestampRecord`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireTimestampRecord {
    pub vehicle_index: u32,
    pub sm_start_tstamp: WireTimestamp,
    pub client_start_tstamp: WireTimestamp,
    pub client_end_tstamp: WireTimestamp,
    pub ecloud_rcv_tstamp: WireTimestamp,
    pub ecloud_snd_tstamp: WireTimestamp,
}

impl From<TimestampRecord> for WireTimestampRecord {
    fn from(r: TimestampRecord) -> Self {
        Self {
            vehicle_index: r.vehicle_index as u32,
            sm_start_tstamp: r.sm_start_tstamp.into(),
            client_start_tstamp: r.client_start_tstamp.into(),
            client_end_tstamp: r.client_end_tstamp.into(),
            ecloud_rcv_tstamp: r.ecloud_rcv_tstamp.into(),
            ecloud_snd_tstamp: r.ecloud_snd_tstamp.into(),
        }
    }
}

impl From<WireTimestampRecord> for TimestampRecord {
    fn from(r: WireTimestampRecord) -> Self {
        Self {
            vehicle_index: r.vehicle_index as usize,
            sm_start_tstamp: r.sm_start_tstamp.into(),
            client_start_tstamp: r.client_start_tstamp.into(),
            client_end_tstamp: r.client_end_tstamp.into(),
            ecloud_rcv_tstamp: r.ecloud_rcv_tstamp.into(),
            ecloud_snd_tstamp: r.ecloud_snd_tstamp.into(),
        }
    }
}

/// Wire encoding of a [`VehicleState`]. Values are arbitrary but stable; any
/// decoder only needs to agree with this module.
#[must_use]
pub fn state_to_code(state: VehicleState) -> i32 {
    match state {
        VehicleState::Registering => 0,
        VehicleState::CarlaUpdate => 1,
        VehicleState::TickOk => 2,
        VehicleState::TickDone => 3,
        VehicleState::DebugInfoUpdate => 4,
    }
}

fn state_from_code(code: i32) -> Option<VehicleState> {
    match code {
        0 => Some(VehicleState::Registering),
        1 => Some(VehicleState::CarlaUpdate),
        2 => Some(VehicleState::TickOk),
        3 => Some(VehicleState::TickDone),
        4 => Some(VehicleState::DebugInfoUpdate),
        _ => None,
    }
}

/// `StartScenario` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStartScenarioRequest {
    pub scenario_config: String,
    pub application: String,
    pub version: String,
    pub expected_vehicle_count: u16,
    pub is_edge: bool,
    pub vehicle_machine_host: String,
    pub vehicle_machine_port: u16,
    pub spectator_index: u32,
}

impl From<WireStartScenarioRequest> for StartScenarioInfo {
    fn from(r: WireStartScenarioRequest) -> Self {
        Self {
            scenario_config: r.scenario_config,
            application: r.application,
            version: r.version,
            expected_vehicle_count: r.expected_vehicle_count,
            is_edge: r.is_edge,
            vehicle_machine_addr: PushAddr {
                host: r.vehicle_machine_host,
                port: r.vehicle_machine_port,
            },
            spectator_index: r.spectator_index as usize,
        }
    }
}

/// Empty ack, shared by every request that has nothing to return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireAck;

/// `Register` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRegisterRequest {
    pub container_name: String,
    pub vehicle_state: i32,
    pub actor_id: Option<String>,
    pub vid: Option<String>,
    pub vehicle_index: Option<u32>,
    /// The raw encoded request, stashed for replies that must forward it
    /// verbatim (`CarlaUpdate`).
    pub raw: Vec<u8>,
}

impl WireRegisterRequest {
    /// Build the wire request a vehicle client sends for one registration
    /// phase.
    #[must_use]
    pub fn from_domain(req: &RegistrationRequest) -> Self {
        Self {
            container_name: req.container_name.clone(),
            vehicle_state: state_to_code(req.vehicle_state),
            actor_id: req.actor_id.clone(),
            vid: req.vid.clone(),
            vehicle_index: req.vehicle_index.map(|i| i as u32),
            raw: req.raw.clone(),
        }
    }

    /// Convert to the core domain type, erroring if `vehicle_state` carries
    /// an unrecognized code.
    ///
    /// # Errors
    ///
    /// Returns a static message if the state code is unknown.
    pub fn into_domain(self) -> Result<RegistrationRequest, &'static str> {
        let vehicle_state = state_from_code(self.vehicle_state).ok_or("unknown vehicle_state")?;
        Ok(RegistrationRequest {
            container_name: self.container_name,
            vehicle_state,
            actor_id: self.actor_id,
            vid: self.vid,
            vehicle_index: self.vehicle_index.map(|i| i as usize),
            raw: self.raw,
        })
    }
}

/// `Register` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRegisterResponse {
    pub vehicle_index: u32,
    pub scenario_config: String,
    pub application: String,
    pub version: String,
}

impl From<RegistrationResponse> for WireRegisterResponse {
    fn from(r: RegistrationResponse) -> Self {
        Self {
            vehicle_index: r.vehicle_index as u32,
            scenario_config: r.scenario_config,
            application: r.application,
            version: r.version,
        }
    }
}

/// `DoTick` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDoTickRequest {
    pub tick_id: u32,
    pub command: i32,
}

impl WireDoTickRequest {
    #[must_use]
    pub fn command(&self) -> Command {
        Command::from_code(self.command)
    }
}

/// `SendUpdate` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSendUpdateRequest {
    pub vehicle_index: u32,
    pub tick_id: u32,
    pub vehicle_state: i32,
    pub client_start_tstamp: WireTimestamp,
    pub client_end_tstamp: WireTimestamp,
    pub raw: Vec<u8>,
}

impl WireSendUpdateRequest {
    /// Build the wire request a vehicle client sends to report a tick
    /// reply.
    #[must_use]
    pub fn from_domain(reply: &VehicleReply) -> Self {
        Self {
            vehicle_index: reply.vehicle_index as u32,
            tick_id: reply.tick_id,
            vehicle_state: state_to_code(reply.state),
            client_start_tstamp: reply.client_start_tstamp.into(),
            client_end_tstamp: reply.client_end_tstamp.into(),
            raw: reply.raw.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns a static message if `vehicle_state` carries an unknown code.
    pub fn into_domain(self) -> Result<VehicleReply, &'static str> {
        let state = state_from_code(self.vehicle_state).ok_or("unknown vehicle_state")?;
        Ok(VehicleReply {
            vehicle_index: self.vehicle_index as usize,
            tick_id: self.tick_id,
            state,
            client_start_tstamp: self.client_start_tstamp.into(),
            client_end_tstamp: self.client_end_tstamp.into(),
            raw: self.raw,
        })
    }
}

/// `GetVehicleUpdates` response: the drained batch of pending replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireVehicleUpdatesResponse {
    pub replies: Vec<Vec<u8>>,
}

impl WireVehicleUpdatesResponse {
    #[must_use]
    pub fn from_raw(replies: Vec<Vec<u8>>) -> Self {
        Self { replies }
    }
}

/// One vehicle's waypoint plan, as carried by `PushEdgeWaypoints`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireWaypointEntry {
    pub vehicle_index: u32,
    pub buffer: Vec<u8>,
}

impl From<WireWaypointEntry> for EdgeWaypointEntry {
    fn from(e: WireWaypointEntry) -> Self {
        Self {
            vehicle_index: e.vehicle_index as usize,
            buffer: e.buffer,
        }
    }
}

/// `PushEdgeWaypoints` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePushEdgeWaypointsRequest {
    pub entries: Vec<WireWaypointEntry>,
}

/// `GetWaypoints` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireGetWaypointsRequest {
    pub vehicle_index: u32,
}

/// `GetWaypoints` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireGetWaypointsResponse {
    pub buffer: Vec<u8>,
}

/// The message pushed to a peer carrying tick progress
/// (`ecloud-net`'s `NatsPusher` request body).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirePushTick {
    pub tick_id: u32,
    pub command: i32,
    pub sm_start_tstamp: Option<WireTimestamp>,
    pub timestamps: Vec<WireTimestampRecord>,
}

impl From<&PushTick> for WirePushTick {
    fn from(msg: &PushTick) -> Self {
        Self {
            tick_id: msg.tick_id,
            command: msg.command.code(),
            sm_start_tstamp: msg.sm_start_tstamp.map(Into::into),
            timestamps: msg.timestamps.iter().copied().map(Into::into).collect(),
        }
    }
}

impl WirePushTick {
    #[must_use]
    pub fn command(&self) -> Command {
        Command::from_code(self.command)
    }
}

/// An error reply body, used whenever a request handler returns
/// `Err(NetError)` instead of the operation's normal response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireErrorReply {
    pub message: String,
}
