//! Peer Registry (`SPEC_FULL.md` §4.2).
//!
//! Grounded on `engine_app::registry::SystemRegistry`'s entry-or-insert
//! pattern, generalized from named-system/multi-instance tracking to
//! index-assigned/single-instance tracking: one vehicle owns exactly one
//! index for the life of the process.

use std::sync::{Arc, Mutex};

use crate::error::CoordError;
use crate::pusher::Pusher;
use crate::types::PushAddr;

/// Everything the registry knows about one connected vehicle.
pub struct VehicleInfo {
    /// Human-readable container/display name.
    pub name: String,
    /// The vehicle's push address.
    pub push_addr: PushAddr,
    /// Handle used to push ticks to this vehicle.
    pub pusher: Arc<dyn Pusher>,
}

struct Inner {
    vehicles: Vec<VehicleInfo>,
    capacity: usize,
    simulator_pusher: Option<Arc<dyn Pusher>>,
}

/// Registry of all vehicle clients known to the coordinator, plus the
/// simulator's own push handle.
///
/// `assign_vehicle_index` is guarded by a single registration mutex, taken
/// only during `Register` (`SPEC_FULL.md` §5).
pub struct PeerRegistry {
    inner: Mutex<Inner>,
}

impl PeerRegistry {
    /// Create an empty registry with room for at most `capacity` vehicles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                vehicles: Vec::with_capacity(capacity),
                capacity,
                simulator_pusher: None,
            }),
        }
    }

    /// Record the simulator's push handle (set once, at coordinator start).
    pub fn set_simulator_pusher(&self, pusher: Arc<dyn Pusher>) {
        self.inner.lock().unwrap().simulator_pusher = Some(pusher);
    }

    /// Returns the simulator's push handle, if one has been set.
    #[must_use]
    pub fn simulator_pusher(&self) -> Option<Arc<dyn Pusher>> {
        self.inner.lock().unwrap().simulator_pusher.clone()
    }

    /// Allocate the next free index for a newly-registering vehicle.
    ///
    /// `make_push_addr` and `make_pusher` are called with the confirmed
    /// index while the registration lock is still held, so the address and
    /// pusher a vehicle is handed always match the index it was actually
    /// assigned — they must never be derived from a count read before this
    /// call takes the lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::Capacity`] if the registry is already full.
    pub fn assign_vehicle_index(
        &self,
        name: String,
        make_push_addr: impl FnOnce(usize) -> PushAddr,
        make_pusher: impl FnOnce(usize) -> Arc<dyn Pusher>,
    ) -> Result<usize, CoordError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.vehicles.len() >= inner.capacity {
            return Err(CoordError::Capacity);
        }
        let index = inner.vehicles.len();
        inner.vehicles.push(VehicleInfo {
            name,
            push_addr: make_push_addr(index),
            pusher: make_pusher(index),
        });
        Ok(index)
    }

    /// Returns the number of vehicles currently registered.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.inner.lock().unwrap().vehicles.len()
    }

    /// Returns every vehicle's push handle, in index order.
    #[must_use]
    pub fn vehicle_pushers(&self) -> Vec<Arc<dyn Pusher>> {
        self.inner
            .lock()
            .unwrap()
            .vehicles
            .iter()
            .map(|v| v.pusher.clone())
            .collect()
    }

    /// Returns the display name registered for a vehicle index, if any.
    #[must_use]
    pub fn name_of(&self, vehicle_index: usize) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .vehicles
            .get(vehicle_index)
            .map(|v| v.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pusher::PushError;
    use crate::types::PushTick;
    use async_trait::async_trait;

    struct NullPusher;

    #[async_trait]
    impl Pusher for NullPusher {
        async fn push_tick(&self, _msg: &PushTick) -> Result<(), PushError> {
            Ok(())
        }
    }

    fn addr(port: u16) -> PushAddr {
        PushAddr {
            host: "localhost".to_string(),
            port,
        }
    }

    #[test]
    fn assigns_contiguous_indices() {
        let registry = PeerRegistry::new(3);
        let i0 = registry
            .assign_vehicle_index("car-0".into(), |i| addr(50101 + i as u16), |_| Arc::new(NullPusher) as Arc<dyn Pusher>)
            .unwrap();
        let i1 = registry
            .assign_vehicle_index("car-1".into(), |i| addr(50101 + i as u16), |_| Arc::new(NullPusher) as Arc<dyn Pusher>)
            .unwrap();
        let i2 = registry
            .assign_vehicle_index("car-2".into(), |i| addr(50101 + i as u16), |_| Arc::new(NullPusher) as Arc<dyn Pusher>)
            .unwrap();
        assert_eq!((i0, i1, i2), (0, 1, 2));
    }

    #[test]
    fn rejects_over_capacity_registration() {
        let registry = PeerRegistry::new(1);
        registry
            .assign_vehicle_index("car-0".into(), |i| addr(50101 + i as u16), |_| Arc::new(NullPusher) as Arc<dyn Pusher>)
            .unwrap();
        let err = registry
            .assign_vehicle_index("car-1".into(), |i| addr(50101 + i as u16), |_| Arc::new(NullPusher) as Arc<dyn Pusher>)
            .unwrap_err();
        assert!(matches!(err, CoordError::Capacity));
    }

    #[test]
    fn tracks_simulator_pusher_independently() {
        let registry = PeerRegistry::new(2);
        assert!(registry.simulator_pusher().is_none());
        registry.set_simulator_pusher(Arc::new(NullPusher));
        assert!(registry.simulator_pusher().is_some());
        assert_eq!(registry.registered_count(), 0);
    }
}
