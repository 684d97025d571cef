//! Vehicle client configuration.

/// Configuration for one vehicle client process.
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    /// Human-readable container/display name, echoed back by the
    /// coordinator in logs (the original's `container_name`).
    pub container_name: String,
    /// Simulator-side actor id, supplied once the simulator has spawned the
    /// actor this vehicle drives.
    pub actor_id: String,
    /// Simulator-side vehicle id.
    pub vid: String,
    /// Optional NATS URL override (defaults to `NATS_URL` env or localhost).
    pub nats_url: Option<String>,
}

impl VehicleConfig {
    /// Create a new vehicle config with the given identifying fields.
    #[must_use]
    pub fn new(
        container_name: impl Into<String>,
        actor_id: impl Into<String>,
        vid: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            actor_id: actor_id.into(),
            vid: vid.into(),
            nats_url: None,
        }
    }

    /// Override the NATS URL for this vehicle.
    #[must_use]
    pub fn with_nats_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = Some(url.into());
        self
    }
}
