//! A single power producer and its command/acknowledge handshake.
//!
//! The owning vehicle calls [`PowerUnit::exchange`] and blocks until the unit's
//! own thread, parked in [`PowerUnit::serve`], has consumed the command and
//! applied at most one power step. Both sides wait on the same condvar; only
//! two threads ever touch a unit, so `notify_all` wakes exactly the peer.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::trace;

use crate::error::{RaceError, Result};
use crate::executor::CancelToken;
use crate::types::{Command, Power};

/// Point-in-time view of a unit for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    pub current: Power,
    pub max: Option<Power>,
    pub command: Command,
}

struct UnitState {
    max_power: Option<Power>,
    current_power: Power,
    command: Command,
    ready: bool,
    outcome: Option<Result<Power>>,
}

impl UnitState {
    /// Apply one boundary-checked power step.
    fn step(&mut self, command: Command) -> Result<Power> {
        match command {
            Command::Accelerate => {
                let max = self.max_power.ok_or(RaceError::UnitNotConfigured)?;
                if self.current_power < max {
                    self.current_power += 1;
                }
            }
            Command::Brake => {
                let max = self.max_power.ok_or(RaceError::UnitNotConfigured)?;
                // Braking is refused at the cap as well as at zero.
                if self.current_power > 0 && self.current_power < max {
                    self.current_power -= 1;
                }
            }
            Command::Finish => {}
        }
        Ok(self.current_power)
    }
}

pub struct PowerUnit {
    state: Mutex<UnitState>,
    signal: Condvar,
}

impl PowerUnit {
    /// Create an unconfigured unit at power 0.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UnitState {
                max_power: None,
                current_power: 0,
                command: Command::Finish,
                ready: false,
                outcome: None,
            }),
            signal: Condvar::new(),
        }
    }

    /// Set the cap. Only meaningful before the unit's task starts.
    pub fn set_max_power(&self, max: Option<Power>) {
        let mut guard = self.state.lock().expect("power unit mutex poisoned");
        guard.max_power = max;
        if let Some(max) = max {
            guard.current_power = guard.current_power.min(max);
        }
    }

    pub fn current_power(&self) -> Power {
        self.state
            .lock()
            .expect("power unit mutex poisoned")
            .current_power
    }

    /// Whether a command is pending and not yet consumed.
    pub fn is_ready(&self) -> bool {
        self.state.lock().expect("power unit mutex poisoned").ready
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        let guard = self.state.lock().expect("power unit mutex poisoned");
        UnitSnapshot {
            current: guard.current_power,
            max: guard.max_power,
            command: guard.command,
        }
    }

    /// Vehicle side: issue `command` and block until the unit acknowledges.
    ///
    /// On cancellation the pending command is withdrawn so the unit never
    /// consumes it after the vehicle has stopped waiting.
    pub fn exchange(&self, command: Command, cancel: &CancelToken, poll: Duration) -> Result<Power> {
        let mut guard = self.state.lock().expect("power unit mutex poisoned");
        guard.command = command;
        guard.outcome = None;
        guard.ready = true;
        self.signal.notify_all();
        loop {
            if let Some(outcome) = guard.outcome.take() {
                return outcome;
            }
            if cancel.is_cancelled() {
                guard.ready = false;
                return Err(RaceError::Cancelled);
            }
            guard = self
                .signal
                .wait_timeout(guard, poll)
                .expect("condvar wait failed")
                .0;
        }
    }

    /// Unit side: consume commands one at a time until cancelled.
    pub fn serve(&self, cancel: &CancelToken, poll: Duration) -> Result<()> {
        let mut guard = self.state.lock().expect("power unit mutex poisoned");
        loop {
            while !guard.ready {
                if cancel.is_cancelled() {
                    return Err(RaceError::Cancelled);
                }
                guard = self
                    .signal
                    .wait_timeout(guard, poll)
                    .expect("condvar wait failed")
                    .0;
            }
            guard.ready = false;
            let command = guard.command;
            let outcome = guard.step(command);
            trace!(?command, power = guard.current_power, "unit stepped");
            guard.outcome = Some(outcome);
            self.signal.notify_all();
        }
    }
}

impl Default for PowerUnit {
    fn default() -> Self {
        Self::new()
    }
}
