//! A vehicle drives its units round by round toward a power goal.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::active::ActiveCount;
use crate::config::RaceConfig;
use crate::error::{RaceError, Result};
use crate::executor::CancelToken;
use crate::power_unit::PowerUnit;
use crate::report::{RaceReporter, RoundReport};
use crate::types::{Command, Direction, LegId, Power};

/// Goal in force when a round starts.
#[derive(Clone, Copy, Debug)]
struct LegPlan {
    leg: LegId,
    goal: Power,
    direction: Direction,
}

struct VehicleState {
    goal: Power,
    direction: Option<Direction>,
    leg: LegId,
    accumulated: Power,
    finished: bool,
    rounds: u64,
    stall_reported: bool,
}

pub struct Vehicle {
    id: String,
    units: Vec<Arc<PowerUnit>>,
    state: Mutex<VehicleState>,
    changed: Condvar,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, units: Vec<PowerUnit>) -> Self {
        Self {
            id: id.into(),
            units: units.into_iter().map(Arc::new).collect(),
            state: Mutex::new(VehicleState {
                goal: 0,
                direction: None,
                leg: 0,
                accumulated: 0,
                finished: false,
                rounds: 0,
                stall_reported: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn units(&self) -> &[Arc<PowerUnit>] {
        &self.units
    }

    /// Assign `caps[i]` to unit `i`; the lengths must match exactly.
    pub fn configure_unit_caps(&self, caps: &[Option<Power>]) -> Result<()> {
        if caps.len() != self.units.len() {
            return Err(RaceError::CapCountMismatch {
                vehicle: self.id.clone(),
                expected: self.units.len(),
                actual: caps.len(),
            });
        }
        for (unit, cap) in self.units.iter().zip(caps) {
            unit.set_max_power(*cap);
        }
        Ok(())
    }

    /// Start a new leg toward `goal`; takes effect from the next round.
    pub fn drive_toward(&self, goal: Power, direction: Direction, leg: LegId) {
        let mut guard = self.state.lock().expect("vehicle mutex poisoned");
        guard.goal = goal;
        guard.direction = Some(direction);
        guard.leg = leg;
        guard.finished = false;
        guard.rounds = 0;
        guard.stall_reported = false;
        self.changed.notify_all();
    }

    pub fn accumulated_power(&self) -> Power {
        self.state
            .lock()
            .expect("vehicle mutex poisoned")
            .accumulated
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().expect("vehicle mutex poisoned").finished
    }

    /// Rounds completed in the current leg.
    pub fn rounds(&self) -> u64 {
        self.state.lock().expect("vehicle mutex poisoned").rounds
    }

    pub fn unit_powers(&self) -> Vec<Power> {
        self.units.iter().map(|unit| unit.current_power()).collect()
    }

    /// `current/max command` per unit, for log lines.
    fn describe_units(&self) -> String {
        self.units
            .iter()
            .map(|unit| {
                let snapshot = unit.snapshot();
                match snapshot.max {
                    Some(max) => format!("{}/{max} {:?}", snapshot.current, snapshot.command),
                    None => format!("{}/- {:?}", snapshot.current, snapshot.command),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Vehicle task body: race every leg until cancelled.
    pub fn run(
        &self,
        active: &ActiveCount,
        reporter: &dyn RaceReporter,
        cancel: &CancelToken,
        config: &RaceConfig,
    ) -> Result<()> {
        let result = self.race(active, reporter, cancel, config);
        match &result {
            Err(RaceError::Cancelled) => debug!(
                vehicle = %self.id,
                units = %self.describe_units(),
                "vehicle interrupted"
            ),
            Err(err) => warn!(vehicle = %self.id, error = %err, "vehicle stopped"),
            Ok(()) => {}
        }
        result
    }

    fn race(
        &self,
        active: &ActiveCount,
        reporter: &dyn RaceReporter,
        cancel: &CancelToken,
        config: &RaceConfig,
    ) -> Result<()> {
        loop {
            let plan = self.await_leg(cancel, config.cancel_poll)?;
            self.run_round(plan, active, reporter, cancel, config.cancel_poll)?;
            if !config.step_delay.is_zero() {
                cancel.sleep(config.step_delay)?;
            }
        }
    }

    /// Idle until an unfinished leg is in force.
    fn await_leg(&self, cancel: &CancelToken, poll: Duration) -> Result<LegPlan> {
        let mut guard = self.state.lock().expect("vehicle mutex poisoned");
        loop {
            if cancel.is_cancelled() {
                return Err(RaceError::Cancelled);
            }
            if let (Some(direction), false) = (guard.direction, guard.finished) {
                return Ok(LegPlan {
                    leg: guard.leg,
                    goal: guard.goal,
                    direction,
                });
            }
            guard = self
                .changed
                .wait_timeout(guard, poll)
                .expect("condvar wait failed")
                .0;
        }
    }

    fn run_round(
        &self,
        plan: LegPlan,
        active: &ActiveCount,
        reporter: &dyn RaceReporter,
        cancel: &CancelToken,
        poll: Duration,
    ) -> Result<()> {
        let command = plan.direction.command();
        let mut moved = false;
        // Strictly one unit at a time, in index order.
        for unit in &self.units {
            let before = unit.current_power();
            let after = unit.exchange(command, cancel, poll)?;
            moved |= before != after;
        }

        let units = self.unit_powers();
        let accumulated: Power = units.iter().sum();

        let (round, reached) = {
            let mut guard = self.state.lock().expect("vehicle mutex poisoned");
            guard.accumulated = accumulated;
            if guard.leg != plan.leg {
                // A new leg arrived mid-round; judge it from the next round on.
                return Ok(());
            }
            guard.rounds += 1;
            let reached = plan.direction.goal_reached(accumulated, plan.goal);
            if reached {
                guard.finished = true;
            } else if !moved && !guard.stall_reported {
                guard.stall_reported = true;
                warn!(
                    vehicle = %self.id,
                    direction = %plan.direction,
                    goal = plan.goal,
                    total = accumulated,
                    units = %self.describe_units(),
                    "no unit can move further toward the goal"
                );
            }
            (guard.rounds, reached)
        };

        let report = RoundReport {
            vehicle: self.id.clone(),
            leg: plan.leg,
            round,
            direction: plan.direction,
            goal: plan.goal,
            accumulated,
            units,
        };
        reporter.on_round(&report);

        if reached {
            for unit in &self.units {
                unit.exchange(Command::Finish, cancel, poll)?;
            }
            reporter.on_finish(&report);
            if active.finish(plan.leg) {
                info!(
                    vehicle = %self.id,
                    remaining = active.remaining(),
                    "vehicle finished leg"
                );
            }
        }
        Ok(())
    }
}
