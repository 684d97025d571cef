//! Scenario configuration (`SPEC_FULL.md` §4.6).
//!
//! `StartScenario` is expected exactly once per process lifetime in the
//! original; we enforce that with a [`OnceLock`] rather than re-checking a
//! boolean flag under a mutex.

use std::sync::OnceLock;

use crate::error::CoordError;
use crate::types::StartScenarioInfo;
use crate::MAX_CARS;

/// The scenario configuration published by `StartScenario`, readable by
/// every later `Register` call.
#[derive(Debug)]
pub struct ScenarioConfig {
    cell: OnceLock<StartScenarioInfo>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioConfig {
    /// Create an unset scenario configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Publish the scenario configuration. A second call is rejected: the
    /// original never re-runs `StartScenario` within one process lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::TooManyVehicles`] if `expected_vehicle_count`
    /// exceeds [`MAX_CARS`].
    pub fn start(&self, info: StartScenarioInfo) -> Result<(), CoordError> {
        if info.expected_vehicle_count as usize > MAX_CARS {
            return Err(CoordError::TooManyVehicles(info.expected_vehicle_count));
        }
        // A second StartScenario silently loses the race against the first;
        // callers only ever start one scenario per process.
        let _ = self.cell.set(info);
        Ok(())
    }

    /// Returns the published scenario configuration, if any.
    #[must_use]
    pub fn get(&self) -> Option<&StartScenarioInfo> {
        self.cell.get()
    }

    /// Whether a scenario has been started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PushAddr;

    fn info(expected_vehicle_count: u16) -> StartScenarioInfo {
        StartScenarioInfo {
            scenario_config: "cfg".into(),
            application: "app".into(),
            version: "1.0".into(),
            expected_vehicle_count,
            is_edge: false,
            vehicle_machine_addr: PushAddr {
                host: "localhost".into(),
                port: 50101,
            },
            spectator_index: 0,
        }
    }

    #[test]
    fn starts_and_reports_started() {
        let cfg = ScenarioConfig::new();
        assert!(!cfg.is_started());
        cfg.start(info(3)).unwrap();
        assert!(cfg.is_started());
        assert_eq!(cfg.get().unwrap().expected_vehicle_count, 3);
    }

    #[test]
    fn rejects_over_max_cars() {
        let cfg = ScenarioConfig::new();
        let err = cfg.start(info(MAX_CARS as u16 + 1)).unwrap_err();
        assert!(matches!(err, CoordError::TooManyVehicles(_)));
        assert!(!cfg.is_started());
    }

    #[test]
    fn second_start_is_ignored() {
        let cfg = ScenarioConfig::new();
        cfg.start(info(2)).unwrap();
        cfg.start(info(5)).unwrap();
        assert_eq!(cfg.get().unwrap().expected_vehicle_count, 2);
    }
}
