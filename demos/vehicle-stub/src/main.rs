//! A minimal vehicle client: registers, then reports `TickOk` on every tick
//! with no payload, until the coordinator conveys `End`.
//!
//! Useful for exercising a coordinator process end-to-end without a real
//! CARLA/OpenCDA actor attached.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecloud_core::types::VehicleState;
use ecloud_vehicle::{VehicleConfig, VehicleRunner};

#[derive(Parser)]
#[command(name = "vehicle-stub", about = "Minimal ecloud vehicle client")]
struct Args {
    /// Display name for this vehicle's container.
    #[arg(long, default_value = "carla-vehicle-stub")]
    container_name: String,

    /// Simulator-side actor id.
    #[arg(long, default_value = "actor-stub")]
    actor_id: String,

    /// Simulator-side vehicle id.
    #[arg(long, default_value = "vid-stub")]
    vid: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = VehicleConfig::new(args.container_name, args.actor_id, args.vid);
    let runner = VehicleRunner::new(config);

    runner
        .run(move |ctx| {
            info!(tick_id = ctx.tick_id, waypoints = ctx.waypoints.len(), "tick");
            ctx.report(VehicleState::TickOk, Vec::new());
        })
        .await
}
