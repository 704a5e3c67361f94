//! Owns the vehicles of a race and the lifecycle of their tasks.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::active::ActiveCount;
use crate::config::RaceConfig;
use crate::error::{RaceError, Result};
use crate::executor::TaskPool;
use crate::factory::VehicleFactory;
use crate::report::RaceReporter;
use crate::types::{Direction, Power, VehicleHandle};
use crate::vehicle::Vehicle;

pub struct RaceCoordinator {
    factory: Box<dyn VehicleFactory>,
    reporter: Arc<dyn RaceReporter>,
    config: RaceConfig,
    vehicles: Vec<Arc<Vehicle>>,
    active: Arc<ActiveCount>,
    pool: Option<TaskPool>,
    started: bool,
}

impl RaceCoordinator {
    pub fn new(
        factory: Box<dyn VehicleFactory>,
        reporter: Arc<dyn RaceReporter>,
        config: RaceConfig,
    ) -> Self {
        Self {
            factory,
            reporter,
            config,
            vehicles: Vec::new(),
            active: Arc::new(ActiveCount::new()),
            pool: None,
            started: false,
        }
    }

    /// Build and register a vehicle; only before `start`.
    pub fn create_vehicle(&mut self, id: &str, units: usize) -> Result<VehicleHandle> {
        if self.started {
            return Err(RaceError::AlreadyStarted);
        }
        if units == 0 {
            return Err(RaceError::NoUnits(id.to_string()));
        }
        let vehicle = self.factory.create_vehicle(id, units);
        self.vehicles.push(Arc::new(vehicle));
        debug!(vehicle = id, units, "vehicle registered");
        Ok(VehicleHandle(self.vehicles.len() - 1))
    }

    pub fn set_unit_caps(&self, handle: VehicleHandle, caps: &[Option<Power>]) -> Result<()> {
        if self.started {
            return Err(RaceError::AlreadyStarted);
        }
        self.vehicle(handle)
            .ok_or(RaceError::UnknownVehicle(handle))?
            .configure_unit_caps(caps)
    }

    pub fn vehicle(&self, handle: VehicleHandle) -> Option<&Arc<Vehicle>> {
        self.vehicles.get(handle.0)
    }

    pub fn vehicles(&self) -> &[Arc<Vehicle>] {
        &self.vehicles
    }

    /// Open a new leg: every vehicle races toward `goal` in `direction`.
    pub fn drive_all_toward(&self, goal: Power, direction: Direction) {
        let leg = self.active.reset(self.vehicles.len());
        info!(goal, %direction, leg, vehicles = self.vehicles.len(), "race leg issued");
        for vehicle in &self.vehicles {
            vehicle.drive_toward(goal, direction, leg);
        }
    }

    /// Vehicles that have not finished the current leg.
    pub fn active_count(&self) -> usize {
        self.active.remaining()
    }

    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        self.active.wait_until_settled(timeout)
    }

    /// Launch one task per vehicle and one per unit.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(RaceError::AlreadyStarted);
        }
        self.started = true;
        let pool = TaskPool::new();
        for vehicle in &self.vehicles {
            for (index, unit) in vehicle.units().iter().enumerate() {
                let unit = Arc::clone(unit);
                let poll = self.config.cancel_poll;
                pool.run(format!("vehicle-{}-unit-{index}", vehicle.id()), move |cancel| {
                    unit.serve(&cancel, poll)
                })?;
            }
            let task_vehicle = Arc::clone(vehicle);
            let active = Arc::clone(&self.active);
            let reporter = Arc::clone(&self.reporter);
            let config = self.config.clone();
            pool.run(format!("vehicle-{}", vehicle.id()), move |cancel| {
                task_vehicle.run(&active, reporter.as_ref(), &cancel, &config)
            })?;
        }
        info!(tasks = pool.len(), "race started");
        self.pool = Some(pool);
        Ok(())
    }

    /// Cancel and join every task. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let panicked = pool.shutdown(true);
            debug_assert!(
                self.vehicles
                    .iter()
                    .all(|vehicle| vehicle.units().iter().all(|unit| !unit.is_ready())),
                "command left pending after shutdown"
            );
            info!(panicked, remaining = self.active.remaining(), "race stopped");
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }
}

impl Drop for RaceCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
