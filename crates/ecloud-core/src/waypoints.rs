//! Edge-mode waypoint relay (`SPEC_FULL.md` §4.5).
//!
//! In edge mode the coordinator is a dumb relay between the centralized
//! planner and each vehicle's `GetWaypoints` poll: `PushEdgeWaypoints`
//! replaces the whole buffer, `GetWaypoints` drains one vehicle's entry.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::EdgeWaypointEntry;

/// Holds the most recently pushed waypoint buffer per vehicle.
pub struct EdgeWaypointBuffer {
    entries: Mutex<HashMap<usize, Vec<u8>>>,
}

impl Default for EdgeWaypointBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeWaypointBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the buffer wholesale with a fresh batch of plans.
    pub fn put(&self, entries: Vec<EdgeWaypointEntry>) {
        let mut guard = self.entries.lock().unwrap();
        guard.clear();
        for entry in entries {
            guard.insert(entry.vehicle_index, entry.buffer);
        }
    }

    /// Read the buffer currently held for `vehicle_index`, if any. No
    /// implicit lifetime: entries persist across reads until the next
    /// `put` replaces them, matching the original's non-destructive linear
    /// scan in `Client_GetWaypoints` — a second poll before the next push
    /// must see the same buffer, not an empty one. Returns an empty buffer
    /// (not an error) for a vehicle with nothing queued.
    #[must_use]
    pub fn get(&self, vehicle_index: usize) -> Vec<u8> {
        self.entries
            .lock()
            .unwrap()
            .get(&vehicle_index)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let buf = EdgeWaypointBuffer::new();
        buf.put(vec![
            EdgeWaypointEntry {
                vehicle_index: 0,
                buffer: vec![1, 2, 3],
            },
            EdgeWaypointEntry {
                vehicle_index: 1,
                buffer: vec![4, 5],
            },
        ]);
        assert_eq!(buf.get(0), vec![1, 2, 3]);
        assert_eq!(buf.get(1), vec![4, 5]);
    }

    #[test]
    fn get_on_missing_vehicle_is_empty_not_error() {
        let buf = EdgeWaypointBuffer::new();
        assert_eq!(buf.get(7), Vec::<u8>::new());
    }

    #[test]
    fn get_does_not_drain_the_entry() {
        let buf = EdgeWaypointBuffer::new();
        buf.put(vec![EdgeWaypointEntry {
            vehicle_index: 0,
            buffer: vec![9],
        }]);
        assert_eq!(buf.get(0), vec![9]);
        // A second poll before the next `put` must still see the same buffer.
        assert_eq!(buf.get(0), vec![9]);
    }

    #[test]
    fn put_replaces_previous_batch_wholesale() {
        let buf = EdgeWaypointBuffer::new();
        buf.put(vec![EdgeWaypointEntry {
            vehicle_index: 0,
            buffer: vec![1],
        }]);
        buf.put(vec![EdgeWaypointEntry {
            vehicle_index: 1,
            buffer: vec![2],
        }]);
        assert_eq!(buf.get(0), Vec::<u8>::new());
        assert_eq!(buf.get(1), vec![2]);
    }
}
