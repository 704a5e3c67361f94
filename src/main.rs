mod active;
mod config;
mod coordinator;
mod error;
mod executor;
mod factory;
mod logging;
mod power_unit;
mod report;
mod sim;
mod types;
mod vehicle;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{RaceConfig, VehicleSpec};
use crate::sim::{BenchOptions, DemoOptions};
use crate::types::Power;

/// Lockstep booster race: vehicles drive their power units round by round
/// toward a shared goal.
#[derive(Parser, Debug)]
#[command(name = "booster_race", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Accelerate every vehicle to a goal, then brake to a lower one (default)
    Demo(DemoArgs),
    /// Sweep vehicle and unit counts and print CSV timings
    Bench(BenchArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Vehicle as ID:CAP,CAP,... (repeatable; replaces the default pair)
    #[arg(long = "vehicle", value_name = "ID:CAPS")]
    vehicles: Vec<VehicleSpec>,

    /// Goal power for the accelerate leg
    #[arg(long, default_value_t = sim::DEFAULT_FORWARD_GOAL)]
    forward: Power,

    /// Goal power for the brake leg
    #[arg(long, default_value_t = sim::DEFAULT_BACK_GOAL)]
    back: Power,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value_t = sim::DEFAULT_STEP_MS)]
    step_ms: u64,

    /// Maximum wait for each leg to settle in milliseconds
    #[arg(long, default_value_t = sim::DEFAULT_SETTLE_MS)]
    settle_ms: u64,
}

impl DemoArgs {
    fn into_options(self) -> DemoOptions {
        let vehicles = if self.vehicles.is_empty() {
            VehicleSpec::demo_defaults()
        } else {
            self.vehicles
        };
        DemoOptions {
            vehicles,
            forward: self.forward,
            back: self.back,
            config: RaceConfig::default().with_step_delay(Duration::from_millis(self.step_ms)),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Vehicle counts to sweep (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,4,8")]
    vehicles: Vec<usize>,

    /// Units per vehicle to sweep (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,3,6")]
    units: Vec<usize>,

    /// Goal power every vehicle accelerates to
    #[arg(long, default_value_t = 50)]
    goal: Power,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value_t = 0)]
    step_ms: u64,

    /// Maximum wait per configuration in milliseconds
    #[arg(long, default_value_t = 30_000)]
    settle_ms: u64,
}

impl BenchArgs {
    fn into_options(self) -> BenchOptions {
        BenchOptions {
            vehicle_sets: self.vehicles,
            unit_sets: self.units,
            goal: self.goal,
            config: RaceConfig::default().with_step_delay(Duration::from_millis(self.step_ms)),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Some(Mode::Demo(args)) => sim::run_demo(&args.into_options())?,
        Some(Mode::Bench(args)) => sim::run_benchmark(&args.into_options())?,
        None => sim::run_demo(&DemoOptions::default())?,
    }
    Ok(())
}
