//! Demo race and benchmark runners.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{RaceConfig, VehicleSpec};
use crate::coordinator::RaceCoordinator;
use crate::error::Result;
use crate::factory::StandardFactory;
use crate::report::{NullReporter, RaceReporter, TracingReporter};
use crate::types::{Direction, Power};

pub const DEFAULT_FORWARD_GOAL: Power = 12;
pub const DEFAULT_BACK_GOAL: Power = 7;
pub const DEFAULT_STEP_MS: u64 = 100;
pub const DEFAULT_SETTLE_MS: u64 = 10_000;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    let mut usage = rusage {
        ru_utime: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        ru_stime: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        ru_maxrss: 0,
        ru_ixrss: 0,
        ru_idrss: 0,
        ru_isrss: 0,
        ru_minflt: 0,
        ru_majflt: 0,
        ru_nswap: 0,
        ru_inblock: 0,
        ru_oublock: 0,
        ru_msgsnd: 0,
        ru_msgrcv: 0,
        ru_nsignals: 0,
        ru_nvcsw: 0,
        ru_nivcsw: 0,
    };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

fn build_race(
    specs: &[VehicleSpec],
    reporter: Arc<dyn RaceReporter>,
    config: RaceConfig,
) -> Result<RaceCoordinator> {
    let mut race = RaceCoordinator::new(Box::new(StandardFactory), reporter, config);
    for spec in specs {
        let handle = race.create_vehicle(&spec.id, spec.caps.len())?;
        race.set_unit_caps(handle, &spec.caps)?;
    }
    Ok(race)
}

/// Settings for the two-leg demo race.
#[derive(Clone, Debug)]
pub struct DemoOptions {
    pub vehicles: Vec<VehicleSpec>,
    pub forward: Power,
    pub back: Power,
    pub config: RaceConfig,
    pub settle: Duration,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            vehicles: VehicleSpec::demo_defaults(),
            forward: DEFAULT_FORWARD_GOAL,
            back: DEFAULT_BACK_GOAL,
            config: RaceConfig::default().with_step_delay(Duration::from_millis(DEFAULT_STEP_MS)),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

/// Outcome of one leg, captured once the leg settles or times out.
struct LegSummary {
    direction: Direction,
    goal: Power,
    settled: bool,
    remaining: usize,
    vehicles: Vec<(String, Power, Vec<Power>, bool)>,
}

fn summarize_leg(
    race: &RaceCoordinator,
    goal: Power,
    direction: Direction,
    settled: bool,
) -> LegSummary {
    if !settled {
        warn!(goal, %direction, remaining = race.active_count(), "leg did not settle in time");
    }
    LegSummary {
        direction,
        goal,
        settled,
        remaining: race.active_count(),
        vehicles: race
            .vehicles()
            .iter()
            .map(|vehicle| {
                (
                    vehicle.id().to_string(),
                    vehicle.accumulated_power(),
                    vehicle.unit_powers(),
                    vehicle.is_finished(),
                )
            })
            .collect(),
    }
}

/// Accelerate every vehicle to the forward goal, then brake to the back goal.
pub fn run_demo(options: &DemoOptions) -> Result<()> {
    info!(vehicles = options.vehicles.len(), "demo start");
    let mut race = build_race(
        &options.vehicles,
        Arc::new(TracingReporter),
        options.config.clone(),
    )?;

    let start = Instant::now();
    // The first leg is issued before tasks launch so no vehicle idles.
    race.drive_all_toward(options.forward, Direction::Accelerate);
    race.start()?;
    let settled = race.wait_until_settled(options.settle);
    let mut legs = vec![summarize_leg(
        &race,
        options.forward,
        Direction::Accelerate,
        settled,
    )];

    race.drive_all_toward(options.back, Direction::Brake);
    let settled = race.wait_until_settled(options.settle);
    legs.push(summarize_leg(&race, options.back, Direction::Brake, settled));
    race.stop();
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "demo finished");

    let units_total: usize = options.vehicles.iter().map(|spec| spec.caps.len()).sum();
    println!("RACE SUMMARY");
    println!("vehicles={} units_total={units_total}", options.vehicles.len());
    for (index, leg) in legs.iter().enumerate() {
        println!(
            "leg={} direction={} goal={} settled={} active_remaining={}",
            index + 1,
            leg.direction,
            leg.goal,
            leg.settled,
            leg.remaining
        );
        for (id, power, units, finished) in &leg.vehicles {
            println!("vehicle={id} power={power} units={units:?} finished={finished}");
        }
    }
    Ok(())
}

/// Settings for a benchmark sweep.
#[derive(Clone, Debug)]
pub struct BenchOptions {
    pub vehicle_sets: Vec<usize>,
    pub unit_sets: Vec<usize>,
    pub goal: Power,
    pub config: RaceConfig,
    pub settle: Duration,
}

struct BenchResult {
    vehicles: usize,
    units: usize,
    goal: Power,
    rounds_total: u64,
    elapsed_ms: f64,
    rounds_per_s: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    settled: bool,
}

fn benchmark_once(vehicles: usize, units: usize, options: &BenchOptions) -> Result<BenchResult> {
    // Every unit can reach the goal alone, so each leg terminates.
    let specs: Vec<VehicleSpec> = (0..vehicles)
        .map(|index| VehicleSpec {
            id: format!("bench-{index}"),
            caps: vec![Some(options.goal); units],
        })
        .collect();
    let mut race = build_race(&specs, Arc::new(NullReporter), options.config.clone())?;
    race.drive_all_toward(options.goal, Direction::Accelerate);

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    race.start()?;
    let settled = race.wait_until_settled(options.settle);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let rounds_total: u64 = race.vehicles().iter().map(|vehicle| vehicle.rounds()).sum();
    race.stop();

    let rounds_per_s = if elapsed_ms > 0.0 {
        rounds_total as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(BenchResult {
        vehicles,
        units,
        goal: options.goal,
        rounds_total,
        elapsed_ms,
        rounds_per_s,
        cpu_user_s,
        cpu_sys_s,
        settled,
    })
}

/// Sweep vehicle and unit counts and print one CSV row per configuration.
pub fn run_benchmark(options: &BenchOptions) -> Result<()> {
    println!("vehicles,units,goal,rounds_total,elapsed_ms,rounds_per_s,cpu_user_s,cpu_sys_s,settled");
    for &vehicles in &options.vehicle_sets {
        for &units in &options.unit_sets {
            if vehicles == 0 || units == 0 {
                eprintln!("bench warning: skipped vehicles={vehicles} units={units}");
                continue;
            }
            let result = benchmark_once(vehicles, units, options)?;
            let cpu_user = result
                .cpu_user_s
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "NA".to_string());
            let cpu_sys = result
                .cpu_sys_s
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "NA".to_string());
            println!(
                "{},{},{},{},{:.2},{:.2},{},{},{}",
                result.vehicles,
                result.units,
                result.goal,
                result.rounds_total,
                result.elapsed_ms,
                result.rounds_per_s,
                cpu_user,
                cpu_sys,
                result.settled
            );
        }
    }
    Ok(())
}
