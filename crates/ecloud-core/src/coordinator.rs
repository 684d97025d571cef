//! The tick-synchronization coordinator (`SPEC_FULL.md` §4, §6).
//!
//! One [`Coordinator`] is built per process and shared (`Arc`) across every
//! connection handler `ecloud-net` spawns. All mutation happens through
//! `&self`; there is no `&mut` surface once the coordinator is constructed,
//! matching `engine_system::runner::SystemRunner`'s shared-context style.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::CoordError;
use crate::pusher::Pusher;
use crate::registry::PeerRegistry;
use crate::round::RoundState;
use crate::scenario::ScenarioConfig;
use crate::types::{
    Command, EdgeWaypointEntry, PushAddr, PushTick, RegistrationRequest, RegistrationResponse,
    StartScenarioInfo, Timestamp, TimestampRecord, VehicleReply, VehicleState,
};
use crate::waypoints::EdgeWaypointBuffer;
use crate::MAX_CARS;

/// Coarse lifecycle state, checked before most operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingScenario,
    Registering,
    Running,
    Ended,
}

/// Shared tick-synchronization state for one scenario run.
pub struct Coordinator {
    scenario: ScenarioConfig,
    registry: PeerRegistry,
    round: RoundState,
    waypoints: EdgeWaypointBuffer,
    phase: StdMutex<Phase>,
    tick_counter: AtomicU32,
    /// Set by `EndScenario`; once true every `DoTick`'s effective command is
    /// forced to `Command::End` regardless of what the simulator requests,
    /// per `SPEC_FULL.md` §9 (resolving the tension between the original's
    /// unconditional `command_` overwrite in `Server_DoTick` and the
    /// distilled spec's explicit "subsequent DoTicks convey END" wording —
    /// the distilled wording wins).
    ended: AtomicBool,
    /// Bounds the number of in-flight fire-and-forget pushes
    /// (`push_registration_complete`/`push_round_complete`) so a stalled
    /// simulator can't make this process unbounded-spawn tasks
    /// (`SPEC_FULL.md` §5, generalizing the original's unconditional
    /// `std::thread` spawn-and-detach).
    push_permits: Arc<Semaphore>,
}

/// Maximum number of fire-and-forget simulator pushes in flight at once.
const MAX_IN_FLIGHT_PUSHES: usize = 32;

impl Coordinator {
    /// Build a coordinator with room for at most `capacity` vehicles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            scenario: ScenarioConfig::new(),
            registry: PeerRegistry::new(capacity),
            round: RoundState::new(capacity),
            waypoints: EdgeWaypointBuffer::new(),
            phase: StdMutex::new(Phase::AwaitingScenario),
            tick_counter: AtomicU32::new(0),
            ended: AtomicBool::new(false),
            push_permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT_PUSHES)),
        }
    }

    /// `StartScenario`: publish the scenario configuration and record the
    /// simulator's push handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::TooManyVehicles`] if `expected_vehicle_count`
    /// exceeds [`MAX_CARS`].
    pub fn start_scenario(
        &self,
        info: StartScenarioInfo,
        simulator_pusher: Arc<dyn Pusher>,
    ) -> Result<(), CoordError> {
        let expected_count = info.expected_vehicle_count as usize;
        self.scenario.start(info)?;
        self.registry.set_simulator_pusher(simulator_pusher);
        self.round
            .reset(0, Command::Tick, Timestamp::default(), expected_count);
        *self.phase.lock().unwrap() = Phase::Registering;
        info!("scenario started");
        Ok(())
    }

    /// `Register`: assign an index on `Registering`, record a `CarlaUpdate`
    /// confirmation on the second phase.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::ScenarioNotStarted`] if called before
    /// `StartScenario`, [`CoordError::Capacity`] once `expected_vehicle_count`
    /// vehicles have already registered, or [`CoordError::UnknownVehicle`]
    /// if a `CarlaUpdate` names an index that was never assigned.
    pub fn register(
        &self,
        request: RegistrationRequest,
        make_pusher: impl FnOnce(usize) -> Arc<dyn Pusher>,
    ) -> Result<RegistrationResponse, CoordError> {
        let info = self.scenario.get().ok_or(CoordError::ScenarioNotStarted)?;

        match request.vehicle_state {
            VehicleState::Registering => {
                // Vehicle i listens at vehicle_machine_addr.host:BASE_PORT+i,
                // matching the original's `vehicle_machine_ip:ECLOUD_PUSH_BASE_PORT+index`.
                // Both the address and the pusher are derived from `idx` *inside*
                // the registry's single locked assignment, not from a separate
                // pre-lock read of the registered count — otherwise two
                // concurrent Registering calls can race and observe the same
                // "next" index.
                let vehicle_machine_addr = info.vehicle_machine_addr.clone();
                let index = self.registry.assign_vehicle_index(
                    request.container_name,
                    move |idx| PushAddr {
                        host: vehicle_machine_addr.host.clone(),
                        port: vehicle_machine_addr.port + idx as u16,
                    },
                    make_pusher,
                )?;
                debug!(vehicle_index = index, "vehicle registering");
                Ok(RegistrationResponse {
                    vehicle_index: index,
                    scenario_config: info.scenario_config.clone(),
                    application: info.application.clone(),
                    version: info.version.clone(),
                })
            }
            VehicleState::CarlaUpdate => {
                let index = request
                    .vehicle_index
                    .ok_or(CoordError::UnknownVehicle(usize::MAX))?;
                if index >= self.registry.registered_count() {
                    return Err(CoordError::UnknownVehicle(index));
                }
                // Only CarlaUpdate replies count toward the registration
                // round's completion — plain Registering calls do not
                // (SPEC_FULL.md §9, resolved from the original's
                // numRepliedVehicles_ increment site).
                let outcome = self.round.record_carla_update(index, request.raw);
                if outcome.complete {
                    self.enter_running();
                }
                Ok(RegistrationResponse {
                    vehicle_index: index,
                    scenario_config: info.scenario_config.clone(),
                    application: info.application.clone(),
                    version: info.version.clone(),
                })
            }
            other => Err(CoordError::UnknownVehicleState(other)),
        }
    }

    fn enter_running(&self) {
        *self.phase.lock().unwrap() = Phase::Running;
        info!(
            vehicles = self.registry.registered_count(),
            "registration round complete, scenario running"
        );
        self.push_registration_complete();
    }

    fn push_registration_complete(&self) {
        if let Some(pusher) = self.registry.simulator_pusher() {
            let msg = PushTick {
                tick_id: 1,
                command: Command::Tick,
                sm_start_tstamp: Some(Timestamp::now()),
                timestamps: Vec::new(),
            };
            spawn_push(self.push_permits.clone(), pusher, msg, "simulator (registration complete)");
        }
    }

    /// `DoTick`: validate tick consecutiveness, reset round state, fan the
    /// tick out to every registered vehicle concurrently.
    ///
    /// Unlike the original's per-vehicle detached thread (`std::thread t;
    /// t.detach()`), this awaits every push with `futures::future::join_all`
    /// — structured concurrency in place of an unstructured fire-and-forget
    /// thread per vehicle (`SPEC_FULL.md` §9).
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::NonConsecutiveTick`] if `tick_id` does not
    /// equal the last tick plus one.
    pub async fn do_tick(&self, tick_id: u32, command: Command) -> Result<(), CoordError> {
        let current = self.tick_counter.load(Ordering::Acquire);
        let expected = current + 1;
        if tick_id != expected {
            return Err(CoordError::NonConsecutiveTick {
                expected,
                got: tick_id,
            });
        }
        self.tick_counter.store(tick_id, Ordering::Release);

        let effective_command = if self.ended.load(Ordering::Acquire) {
            Command::End
        } else {
            command
        };
        let expected_count = self
            .scenario
            .get()
            .map(|info| info.expected_vehicle_count as usize)
            .unwrap_or(0);
        let sm_start_tstamp = Timestamp::now();
        self.round
            .reset(tick_id, effective_command, sm_start_tstamp, expected_count);

        let msg = PushTick {
            tick_id,
            command: effective_command,
            sm_start_tstamp: Some(sm_start_tstamp),
            timestamps: Vec::new(),
        };
        let pushes = self
            .registry
            .vehicle_pushers()
            .into_iter()
            .map(|pusher| {
                let msg = msg.clone();
                async move { pusher.push_tick(&msg).await }
            });
        for result in futures::future::join_all(pushes).await {
            if let Err(err) = result {
                warn!(peer = "vehicle", %err, "push failed");
            }
        }
        debug!(tick_id, ?effective_command, "tick fanned out");
        Ok(())
    }

    /// `SendUpdate`: record one vehicle's tick reply.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::UnknownVehicle`] if the index is out of range.
    pub fn send_update(&self, reply: VehicleReply) -> Result<(), CoordError> {
        if reply.vehicle_index >= self.registry.registered_count() {
            return Err(CoordError::UnknownVehicle(reply.vehicle_index));
        }
        let is_edge = self
            .scenario
            .get()
            .map(|info| info.is_edge)
            .unwrap_or(false);
        let spectator_index = self
            .scenario
            .get()
            .map(|info| info.spectator_index)
            .unwrap_or(0);

        let outcome = self.round.record_send_update(&reply, is_edge, spectator_index);
        if outcome.complete {
            self.push_round_complete();
        }
        Ok(())
    }

    fn push_round_complete(&self) {
        let timestamps = self.round.stamp_and_take_timestamps();
        info!(
            tick_id = self.round.tick_id(),
            replies = timestamps.len(),
            "round complete"
        );
        if let Some(pusher) = self.registry.simulator_pusher() {
            let msg = PushTick {
                tick_id: 1,
                command: self.round.command(),
                sm_start_tstamp: None,
                timestamps,
            };
            spawn_push(self.push_permits.clone(), pusher, msg, "simulator (round complete)");
        }
    }

    /// `GetVehicleUpdates`: drain replies collected so far this round.
    #[must_use]
    pub fn get_vehicle_updates(&self) -> Vec<Vec<u8>> {
        self.round.drain()
    }

    /// `PushEdgeWaypoints`: replace the edge waypoint buffer wholesale.
    pub fn push_edge_waypoints(&self, entries: Vec<EdgeWaypointEntry>) {
        self.waypoints.put(entries);
    }

    /// `GetWaypoints`: read one vehicle's queued waypoint buffer. Does not
    /// drain it — entries persist until the next `PushEdgeWaypoints`.
    #[must_use]
    pub fn get_waypoints(&self, vehicle_index: usize) -> Vec<u8> {
        self.waypoints.get(vehicle_index)
    }

    /// `EndScenario`: mark the scenario ended. Already-in-flight ticks are
    /// unaffected; every `DoTick` from here on conveys `Command::End`.
    pub fn end_scenario(&self) {
        self.ended.store(true, Ordering::Release);
        *self.phase.lock().unwrap() = Phase::Ended;
        warn!("scenario ended");
    }

    /// Whether `EndScenario` has been called.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// The number of vehicles currently registered.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registry.registered_count()
    }
}

fn spawn_push(permits: Arc<Semaphore>, pusher: Arc<dyn Pusher>, msg: PushTick, peer: &'static str) {
    tokio::spawn(async move {
        let Ok(_permit) = permits.acquire_owned().await else {
            return;
        };
        if let Err(err) = pusher.push_tick(&msg).await {
            warn!(peer, %err, "push failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pusher::PushError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPusher {
        received: Mutex<Vec<PushTick>>,
    }

    #[async_trait]
    impl Pusher for RecordingPusher {
        async fn push_tick(&self, msg: &PushTick) -> Result<(), PushError> {
            self.received.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }

    fn scenario_info(n: u16) -> StartScenarioInfo {
        StartScenarioInfo {
            scenario_config: "cfg".into(),
            application: "app".into(),
            version: "1.0".into(),
            expected_vehicle_count: n,
            is_edge: false,
            vehicle_machine_addr: PushAddr {
                host: "localhost".into(),
                port: 50101,
            },
            spectator_index: 0,
        }
    }

    #[tokio::test]
    async fn full_registration_and_tick_round_trip() {
        let coord = Coordinator::new(2);
        let sim = Arc::new(RecordingPusher::default());
        coord.start_scenario(scenario_info(2), sim.clone()).unwrap();

        for i in 0..2u16 {
            let resp = coord
                .register(
                    RegistrationRequest {
                        container_name: format!("car-{i}"),
                        vehicle_state: VehicleState::Registering,
                        actor_id: None,
                        vid: None,
                        vehicle_index: None,
                        raw: Vec::new(),
                    },
                    |_| Arc::new(RecordingPusher::default()) as Arc<dyn Pusher>,
                )
                .unwrap();
            assert_eq!(resp.vehicle_index, i as usize);

            let outcome = coord
                .register(
                    RegistrationRequest {
                        container_name: format!("car-{i}"),
                        vehicle_state: VehicleState::CarlaUpdate,
                        actor_id: Some("actor".into()),
                        vid: Some("vid".into()),
                        vehicle_index: Some(i as usize),
                        raw: vec![i as u8],
                    },
                    |_| Arc::new(RecordingPusher::default()) as Arc<dyn Pusher>,
                )
                .unwrap();
            assert_eq!(outcome.vehicle_index, i as usize);
        }

        coord.do_tick(1, Command::Tick).await.unwrap();
        assert_eq!(coord.round.tick_id(), 1);

        coord
            .send_update(VehicleReply {
                vehicle_index: 0,
                tick_id: 1,
                state: VehicleState::TickOk,
                client_start_tstamp: Timestamp::default(),
                client_end_tstamp: Timestamp::default(),
                raw: vec![0],
            })
            .unwrap();
        coord
            .send_update(VehicleReply {
                vehicle_index: 1,
                tick_id: 1,
                state: VehicleState::TickOk,
                client_start_tstamp: Timestamp::default(),
                client_end_tstamp: Timestamp::default(),
                raw: vec![1],
            })
            .unwrap();

        tokio::task::yield_now().await;
        let received = sim.received.lock().unwrap();
        assert!(received.iter().any(|m| !m.timestamps.is_empty()));
    }

    #[tokio::test]
    async fn non_consecutive_tick_is_rejected() {
        let coord = Coordinator::new(1);
        coord
            .start_scenario(scenario_info(1), Arc::new(RecordingPusher::default()))
            .unwrap();
        let err = coord.do_tick(5, Command::Tick).await.unwrap_err();
        assert!(matches!(err, CoordError::NonConsecutiveTick { expected: 1, got: 5 }));
    }

    #[tokio::test]
    async fn end_scenario_forces_end_on_subsequent_ticks() {
        let coord = Coordinator::new(1);
        coord
            .start_scenario(scenario_info(1), Arc::new(RecordingPusher::default()))
            .unwrap();
        coord.do_tick(1, Command::Tick).await.unwrap();
        coord.end_scenario();
        coord.do_tick(2, Command::Tick).await.unwrap();
        assert_eq!(coord.round.command(), Command::End);
    }

    #[test]
    fn registration_before_start_scenario_errors() {
        let coord = Coordinator::new(1);
        let err = coord
            .register(
                RegistrationRequest {
                    container_name: "car-0".into(),
                    vehicle_state: VehicleState::Registering,
                    actor_id: None,
                    vid: None,
                    vehicle_index: None,
                    raw: Vec::new(),
                },
                |_| Arc::new(RecordingPusher::default()) as Arc<dyn Pusher>,
            )
            .unwrap_err();
        assert!(matches!(err, CoordError::ScenarioNotStarted));
    }

    #[test]
    fn plain_registering_call_does_not_complete_the_round() {
        let coord = Coordinator::new(2);
        coord
            .start_scenario(scenario_info(2), Arc::new(RecordingPusher::default()))
            .unwrap();
        coord
            .register(
                RegistrationRequest {
                    container_name: "car-0".into(),
                    vehicle_state: VehicleState::Registering,
                    actor_id: None,
                    vid: None,
                    vehicle_index: None,
                    raw: Vec::new(),
                },
                |_| Arc::new(RecordingPusher::default()) as Arc<dyn Pusher>,
            )
            .unwrap();
        coord
            .register(
                RegistrationRequest {
                    container_name: "car-1".into(),
                    vehicle_state: VehicleState::Registering,
                    actor_id: None,
                    vid: None,
                    vehicle_index: None,
                    raw: Vec::new(),
                },
                |_| Arc::new(RecordingPusher::default()) as Arc<dyn Pusher>,
            )
            .unwrap();
        // Two Registering calls only: round must not be complete yet.
        assert_eq!(coord.round.replied_count(), 0);
    }
}
