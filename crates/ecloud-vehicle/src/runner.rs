//! Vehicle runner — the main harness for running a vehicle client process.
//!
//! The runner handles NATS connection, two-phase registration, and the
//! per-tick receive-push/fetch-waypoints/step/report-update loop.

use anyhow::Result;
use futures::StreamExt;
use tracing::{debug, info, warn};

use ecloud_core::types::{Command, RegistrationRequest, Timestamp, VehicleReply, VehicleState};
use ecloud_net::connection::DEFAULT_NATS_URL;
use ecloud_net::messages::{
    WireAck, WireGetWaypointsRequest, WireGetWaypointsResponse, WirePushTick,
    WireRegisterRequest, WireRegisterResponse, WireSendUpdateRequest,
};
use ecloud_net::{subjects, NatsConnection};

use crate::config::VehicleConfig;
use crate::context::VehicleContext;

/// Turns a driving-step closure into a NATS-connected vehicle client
/// process, mirroring `engine_system::runner::SystemRunner`'s role on the
/// ECS side.
#[derive(Debug)]
pub struct VehicleRunner {
    config: VehicleConfig,
}

impl VehicleRunner {
    #[must_use]
    pub fn new(config: VehicleConfig) -> Self {
        Self { config }
    }

    /// Run the vehicle lifecycle.
    ///
    /// 1. Connect to NATS.
    /// 2. Register (`Registering` phase, assigns an index; `CarlaUpdate`
    ///    phase, confirms the simulator-side actor).
    /// 3. Subscribe to this vehicle's push subject.
    /// 4. Loop: receive a pushed tick, fetch any queued edge waypoints,
    ///    invoke `step_fn`, report the outcome via `SendUpdate`, ack the
    ///    push. Stops once a push conveys [`Command::End`].
    ///
    /// # Errors
    ///
    /// Returns an error if NATS connection or message handling fails.
    pub async fn run<F>(self, mut step_fn: F) -> Result<()>
    where
        F: FnMut(&mut VehicleContext) + Send + 'static,
    {
        let url = self.config.nats_url.as_deref().unwrap_or(DEFAULT_NATS_URL);
        info!(container = self.config.container_name, url, "vehicle starting");

        let conn = NatsConnection::connect_to(url).await?;

        let first: WireRegisterResponse = conn
            .request(
                subjects::REGISTER,
                &WireRegisterRequest::from_domain(&RegistrationRequest {
                    container_name: self.config.container_name.clone(),
                    vehicle_state: VehicleState::Registering,
                    actor_id: None,
                    vid: None,
                    vehicle_index: None,
                    raw: Vec::new(),
                }),
            )
            .await?;
        let vehicle_index = first.vehicle_index as usize;
        info!(vehicle_index, "assigned vehicle index");

        let _confirmed: WireRegisterResponse = conn
            .request(
                subjects::REGISTER,
                &WireRegisterRequest::from_domain(&RegistrationRequest {
                    container_name: self.config.container_name.clone(),
                    vehicle_state: VehicleState::CarlaUpdate,
                    actor_id: Some(self.config.actor_id.clone()),
                    vid: Some(self.config.vid.clone()),
                    vehicle_index: Some(vehicle_index),
                    raw: Vec::new(),
                }),
            )
            .await?;
        info!(vehicle_index, "registration confirmed");

        let push_subject = subjects::vehicle_push(vehicle_index);
        let mut pushes = conn.subscribe(&push_subject).await?;
        info!(subject = push_subject, "subscribed to push subject");

        while let Some(message) = pushes.next().await {
            let Some(reply_to) = message.reply.clone() else {
                warn!(subject = %message.subject, "push with no reply subject, ignoring");
                continue;
            };

            let wire: WirePushTick = ecloud_net::decode(&message.payload)?;
            let command = wire.command();
            debug!(tick_id = wire.tick_id, ?command, "tick received");

            let waypoints_resp: WireGetWaypointsResponse = conn
                .request(
                    subjects::GET_WAYPOINTS,
                    &WireGetWaypointsRequest {
                        vehicle_index: vehicle_index as u32,
                    },
                )
                .await?;

            let mut ctx = VehicleContext::new(wire.tick_id, command, waypoints_resp.buffer);
            let client_start_tstamp = Timestamp::now();
            step_fn(&mut ctx);
            let client_end_tstamp = Timestamp::now();
            let (state, raw) = ctx.into_outcome();

            let reply = VehicleReply {
                vehicle_index,
                tick_id: wire.tick_id,
                state,
                client_start_tstamp,
                client_end_tstamp,
                raw,
            };
            let _ack: WireAck = conn
                .request(subjects::SEND_UPDATE, &WireSendUpdateRequest::from_domain(&reply))
                .await?;
            conn.reply(&reply_to, &WireAck).await?;

            if command == Command::End {
                info!("scenario ended, vehicle shutting down");
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_runner_construction() {
        let config = VehicleConfig::new("carla-vehicle-0", "actor-0", "vid-0");
        let runner = VehicleRunner::new(config);
        assert_eq!(runner.config.container_name, "carla-vehicle-0");
    }
}
