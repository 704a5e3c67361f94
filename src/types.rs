//! Shared identifiers and command model used across the race.

use std::fmt;

/// Raw power value held by a unit or summed by a vehicle.
pub type Power = u32;
/// Generation number of a drive command issued to every vehicle.
pub type LegId = u64;

/// Goal-directed motion requested of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Accelerate,
    Brake,
}

impl Direction {
    /// Whether `accumulated` satisfies `goal` for this direction.
    pub fn goal_reached(self, accumulated: Power, goal: Power) -> bool {
        match self {
            Direction::Accelerate => accumulated >= goal,
            Direction::Brake => accumulated <= goal,
        }
    }

    /// Unit command that moves power in this direction.
    pub fn command(self) -> Command {
        match self {
            Direction::Accelerate => Command::Accelerate,
            Direction::Brake => Command::Brake,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Accelerate => f.write_str("accelerate"),
            Direction::Brake => f.write_str("brake"),
        }
    }
}

/// Command handed to a single unit for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Accelerate,
    Brake,
    Finish,
}

/// Index of a vehicle registered with the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VehicleHandle(pub(crate) usize);

impl fmt::Display for VehicleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_checks_use_inclusive_bounds() {
        assert!(Direction::Accelerate.goal_reached(12, 12));
        assert!(Direction::Accelerate.goal_reached(13, 12));
        assert!(!Direction::Accelerate.goal_reached(11, 12));
        assert!(Direction::Brake.goal_reached(7, 7));
        assert!(Direction::Brake.goal_reached(6, 7));
        assert!(!Direction::Brake.goal_reached(8, 7));
    }
}
