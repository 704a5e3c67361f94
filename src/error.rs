//! Error type shared by the race components.

use std::io;

use thiserror::Error;

use crate::types::VehicleHandle;

#[derive(Debug, Error)]
pub enum RaceError {
    /// Cap list length differs from the vehicle's unit count.
    #[error("vehicle {vehicle}: expected {expected} unit caps, got {actual}")]
    CapCountMismatch {
        vehicle: String,
        expected: usize,
        actual: usize,
    },

    /// A power step was attempted before the unit's cap was set.
    #[error("power unit stepped before its max power was configured")]
    UnitNotConfigured,

    /// The task observed cancellation while suspended.
    #[error("cancelled")]
    Cancelled,

    /// Setup operation attempted after tasks were launched.
    #[error("race already started")]
    AlreadyStarted,

    /// A vehicle needs at least one power unit to race.
    #[error("vehicle {0} has no power units")]
    NoUnits(String),

    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleHandle),

    #[error("failed to spawn task {name}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid vehicle spec: {0}")]
    InvalidVehicleSpec(String),
}

impl RaceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RaceError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, RaceError>;
