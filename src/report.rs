//! Round and finish reporting for vehicles.

use tracing::info;

use crate::types::{Direction, LegId, Power};

/// State of one vehicle after a completed round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    pub vehicle: String,
    pub leg: LegId,
    pub round: u64,
    pub direction: Direction,
    pub goal: Power,
    pub accumulated: Power,
    pub units: Vec<Power>,
}

/// Sink invoked by vehicle tasks; must tolerate calls from many threads.
pub trait RaceReporter: Send + Sync {
    fn on_round(&self, report: &RoundReport);
    fn on_finish(&self, report: &RoundReport);
}

/// Emits reports as structured `tracing` events.
pub struct TracingReporter;

impl RaceReporter for TracingReporter {
    fn on_round(&self, report: &RoundReport) {
        // Rounds with no power yet are noise.
        if report.accumulated == 0 {
            return;
        }
        info!(
            vehicle = %report.vehicle,
            leg = report.leg,
            round = report.round,
            direction = %report.direction,
            total = report.accumulated,
            units = ?report.units,
            "round complete"
        );
    }

    fn on_finish(&self, report: &RoundReport) {
        info!(
            vehicle = %report.vehicle,
            leg = report.leg,
            rounds = report.round,
            direction = %report.direction,
            goal = report.goal,
            total = report.accumulated,
            units = ?report.units,
            "goal reached"
        );
    }
}

/// Discards every report.
pub struct NullReporter;

impl RaceReporter for NullReporter {
    fn on_round(&self, _report: &RoundReport) {}

    fn on_finish(&self, _report: &RoundReport) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{RaceReporter, RoundReport};

    /// Keeps every report for later assertions.
    #[derive(Default)]
    pub struct RecordingReporter {
        pub rounds: Mutex<Vec<RoundReport>>,
        pub finishes: Mutex<Vec<RoundReport>>,
    }

    impl RecordingReporter {
        pub fn rounds_for(&self, vehicle: &str) -> Vec<RoundReport> {
            self.rounds
                .lock()
                .expect("reporter mutex poisoned")
                .iter()
                .filter(|report| report.vehicle == vehicle)
                .cloned()
                .collect()
        }

        pub fn finishes_for(&self, vehicle: &str) -> Vec<RoundReport> {
            self.finishes
                .lock()
                .expect("reporter mutex poisoned")
                .iter()
                .filter(|report| report.vehicle == vehicle)
                .cloned()
                .collect()
        }
    }

    impl RaceReporter for RecordingReporter {
        fn on_round(&self, report: &RoundReport) {
            self.rounds
                .lock()
                .expect("reporter mutex poisoned")
                .push(report.clone());
        }

        fn on_finish(&self, report: &RoundReport) {
            self.finishes
                .lock()
                .expect("reporter mutex poisoned")
                .push(report.clone());
        }
    }
}
