//! Race timing knobs and vehicle specifications.

use std::str::FromStr;
use std::time::Duration;

use crate::error::RaceError;
use crate::types::Power;

// Poll interval bounding how long any suspended task can miss a cancel.
const DEFAULT_CANCEL_POLL_MS: u64 = 25;

/// Timing shared by every task of a race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaceConfig {
    /// Pause between rounds of a single vehicle.
    pub step_delay: Duration,
    /// Upper bound on any wait before the cancel token is re-checked.
    pub cancel_poll: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::ZERO,
            cancel_poll: Duration::from_millis(DEFAULT_CANCEL_POLL_MS),
        }
    }
}

impl RaceConfig {
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

/// A vehicle id plus one cap per unit, written `ID:CAP,CAP,...`.
///
/// A cap of `-` leaves that unit unconfigured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VehicleSpec {
    pub id: String,
    pub caps: Vec<Option<Power>>,
}

impl VehicleSpec {
    pub fn new(id: impl Into<String>, caps: &[Power]) -> Self {
        Self {
            id: id.into(),
            caps: caps.iter().copied().map(Some).collect(),
        }
    }

    /// Vehicles raced by the default demo.
    pub fn demo_defaults() -> Vec<VehicleSpec> {
        vec![
            VehicleSpec::new("LDSFJA32", &[10, 30, 80]),
            VehicleSpec::new("32WESSDS", &[30, 40, 50, 50, 30, 10]),
        ]
    }
}

impl FromStr for VehicleSpec {
    type Err = RaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || RaceError::InvalidVehicleSpec(raw.to_string());
        let (id, caps) = raw.split_once(':').ok_or_else(invalid)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(invalid());
        }
        let mut parsed = Vec::new();
        for part in caps.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid());
            }
            if part == "-" {
                parsed.push(None);
                continue;
            }
            let cap = part.parse::<Power>().map_err(|_| invalid())?;
            parsed.push(Some(cap));
        }
        Ok(Self {
            id: id.to_string(),
            caps: parsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_caps_in_order() {
        let spec: VehicleSpec = "LDSFJA32:10,30,80".parse().expect("valid spec");
        assert_eq!(spec, VehicleSpec::new("LDSFJA32", &[10, 30, 80]));
    }

    #[test]
    fn dash_leaves_unit_unconfigured() {
        let spec: VehicleSpec = "R1:5, -".parse().expect("valid spec");
        assert_eq!(spec.caps, vec![Some(5), None]);
    }

    #[test]
    fn rejects_malformed_specs() {
        for raw in ["", "R1", ":1,2", "R1:", "R1:1,,2", "R1:x", "R1:-3"] {
            assert!(
                matches!(raw.parse::<VehicleSpec>(), Err(RaceError::InvalidVehicleSpec(_))),
                "accepted {raw:?}"
            );
        }
    }
}
