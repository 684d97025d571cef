//! # ecloud-coordinator
//!
//! The coordinator process owns tick-synchronization state for one
//! co-simulation scenario run. It connects to NATS, builds a shared
//! [`ecloud_core::Coordinator`], and serves the scenario/vehicle request
//! subjects until the connection drops.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI flags (`--port`, `--num-ports`, `--minloglevel`, mirroring the
//!    original's `absl::Flag` set even though NATS subjects replace the raw
//!    gRPC listeners those ports used to bind).
//! 2. Initialise structured logging from `--minloglevel`.
//! 3. Connect to NATS (`NATS_URL` env, default `nats://localhost:4222`).
//! 4. Serve coordinator request subjects until shutdown.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecloud_core::Coordinator;
use ecloud_net::NatsConnection;

/// Mirrors the original server's `ABSL_FLAG` set. `port`/`num_ports` are
/// retained for operational parity with the original's port allocation
/// scheme even though this coordinator addresses vehicles by NATS subject
/// rather than by binding `num_ports` raw sockets starting at `port`.
#[derive(Parser)]
#[command(name = "ecloud-coordinator", about = "Tick-synchronization coordinator for OpenCDA-style co-simulation")]
struct Args {
    /// Sim API server port for the service.
    #[arg(long, default_value_t = 50051)]
    port: u16,

    /// Total number of ports to open; retained for parity with the original
    /// vehicle push port range.
    #[arg(long, default_value_t = 1)]
    num_ports: u16,

    /// Minimum log severity: 0 = info, 1 = warn, 2 = error.
    #[arg(long, default_value_t = 0)]
    minloglevel: u16,

    /// Maximum number of vehicles this scenario run can register.
    #[arg(long, default_value_t = ecloud_core::MAX_CARS)]
    capacity: usize,
}

fn log_directive(minloglevel: u16) -> &'static str {
    match minloglevel {
        0 => "info",
        1 => "warn",
        _ => "error",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_directive(args.minloglevel).into()),
        )
        .init();

    info!(
        port = args.port,
        num_ports = args.num_ports,
        "ecloud coordinator starting"
    );

    let connection = NatsConnection::connect().await?;
    info!("connected to NATS");

    let coordinator = std::sync::Arc::new(Coordinator::new(args.capacity));
    ecloud_net::serve(connection, coordinator).await?;

    info!("ecloud coordinator shut down");
    Ok(())
}
