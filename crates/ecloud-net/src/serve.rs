//! NATS request dispatcher — subscribes to every coordinator-facing subject
//! and routes requests into an [`Arc<Coordinator>`].
//!
//! Grounded on `engine_server::api::Api::run`'s wildcard-subscribe dispatch
//! loop, generalized from engine-server's single await-per-message loop to
//! one spawned task per request: unlike the ECS server, the coordinator's
//! operations (`DoTick`, `SendUpdate`, `Register`, ...) are expected to run
//! concurrently from many vehicles at once, so the request loop only
//! decodes and routes — it never blocks on a handler.

use std::sync::Arc;

use ecloud_core::types::{StartScenarioInfo, VehicleReply};
use ecloud_core::{Coordinator, Pusher};
use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::codec;
use crate::connection::NatsConnection;
use crate::error::NetError;
use crate::messages::{
    WireAck, WireDoTickRequest, WireErrorReply, WireGetWaypointsRequest, WireGetWaypointsResponse,
    WirePushEdgeWaypointsRequest, WireRegisterRequest, WireRegisterResponse,
    WireSendUpdateRequest, WireStartScenarioRequest, WireVehicleUpdatesResponse,
};
use crate::pusher::NatsPusher;
use crate::subjects;

/// Run the coordinator's request dispatcher until the NATS connection
/// closes or the process is asked to shut down.
///
/// # Errors
///
/// Returns [`NetError::Subscribe`] if the wildcard subscription fails.
pub async fn serve(connection: NatsConnection, coordinator: Arc<Coordinator>) -> Result<(), NetError> {
    let subject = format!("{}.>", subjects::PREFIX);
    debug!(subject = %subject, "subscribing to coordinator request subjects");
    let mut subscriber = connection.subscribe(&subject).await?;

    while let Some(message) = subscriber.next().await {
        let Some(reply_to) = message.reply.clone() else {
            warn!(subject = %message.subject, "request with no reply subject, ignoring");
            continue;
        };
        let connection = connection.clone();
        let coordinator = coordinator.clone();
        let subject = message.subject.to_string();
        let payload = message.payload.to_vec();

        tokio::spawn(async move {
            let result = dispatch(&subject, &payload, &coordinator, &connection).await;
            let outcome = match result {
                Ok(bytes) => Ok(bytes),
                Err(err) => {
                    warn!(subject = %subject, %err, "request failed");
                    codec::encode(&WireErrorReply {
                        message: err.to_string(),
                    })
                }
            };
            match outcome {
                Ok(bytes) => {
                    if let Err(err) = connection.client().publish(reply_to, bytes.into()).await {
                        error!(%err, "failed to publish reply");
                    }
                }
                Err(err) => error!(%err, "failed to encode error reply"),
            }
        });
    }

    Ok(())
}

async fn dispatch(
    subject: &str,
    payload: &[u8],
    coordinator: &Arc<Coordinator>,
    connection: &NatsConnection,
) -> Result<Vec<u8>, NetError> {
    match subject {
        s if s == subjects::START_SCENARIO => {
            let request: WireStartScenarioRequest = codec::decode(payload)?;
            let info: StartScenarioInfo = request.into();
            let simulator_pusher = Arc::new(NatsPusher::new(
                connection.clone(),
                subjects::SIMULATOR_PUSH.to_string(),
            ));
            coordinator.start_scenario(info, simulator_pusher)?;
            codec::encode(&WireAck)
        }
        s if s == subjects::REGISTER => {
            let request: WireRegisterRequest = codec::decode(payload)?;
            let domain = request
                .into_domain()
                .map_err(|msg| NetError::Nats(msg.to_string()))?;
            // The pusher is built from the index the coordinator actually
            // confirms, inside its locked assignment — not from a count read
            // here beforehand, which could race against another registration.
            let connection = connection.clone();
            let response = coordinator.register(domain, |index| {
                Arc::new(NatsPusher::new(connection.clone(), subjects::vehicle_push(index))) as Arc<dyn Pusher>
            })?;
            codec::encode(&WireRegisterResponse::from(response))
        }
        s if s == subjects::DO_TICK => {
            let request: WireDoTickRequest = codec::decode(payload)?;
            coordinator.do_tick(request.tick_id, request.command()).await?;
            codec::encode(&WireAck)
        }
        s if s == subjects::SEND_UPDATE => {
            let request: WireSendUpdateRequest = codec::decode(payload)?;
            let reply: VehicleReply = request
                .into_domain()
                .map_err(|msg| NetError::Nats(msg.to_string()))?;
            coordinator.send_update(reply)?;
            codec::encode(&WireAck)
        }
        s if s == subjects::GET_VEHICLE_UPDATES => {
            let replies = coordinator.get_vehicle_updates();
            codec::encode(&WireVehicleUpdatesResponse::from_raw(replies))
        }
        s if s == subjects::PUSH_EDGE_WAYPOINTS => {
            let request: WirePushEdgeWaypointsRequest = codec::decode(payload)?;
            let entries = request.entries.into_iter().map(Into::into).collect();
            coordinator.push_edge_waypoints(entries);
            codec::encode(&WireAck)
        }
        s if s == subjects::GET_WAYPOINTS => {
            let request: WireGetWaypointsRequest = codec::decode(payload)?;
            let buffer = coordinator.get_waypoints(request.vehicle_index as usize);
            codec::encode(&WireGetWaypointsResponse { buffer })
        }
        s if s == subjects::END_SCENARIO => {
            coordinator.end_scenario();
            codec::encode(&WireAck)
        }
        other => Err(NetError::Nats(format!("unknown subject: {other}"))),
    }
}
