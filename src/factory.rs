//! Construction of vehicles and their units.

use crate::power_unit::PowerUnit;
use crate::vehicle::Vehicle;

pub trait VehicleFactory: Send + Sync {
    fn create_unit(&self) -> PowerUnit;

    /// Build a vehicle with `units` fresh units at power 0.
    fn create_vehicle(&self, id: &str, units: usize) -> Vehicle {
        let units = (0..units).map(|_| self.create_unit()).collect();
        Vehicle::new(id, units)
    }
}

/// Unconfigured units; caps are assigned afterwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardFactory;

impl VehicleFactory for StandardFactory {
    fn create_unit(&self) -> PowerUnit {
        PowerUnit::new()
    }
}
