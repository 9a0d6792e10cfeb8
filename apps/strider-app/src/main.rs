//! Strider gait scheduling CLI.
//!
//! Provides two modes of operation:
//! - `simulate`: Run a control loop while producer threads send gait commands
//! - `info`: Print workspace crate versions

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use nalgebra::{DVector, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use strider_core::config::{AdSettings, TrackingWeights};
use strider_core::error::{ConfigError, StriderError};
use strider_core::modes::stance_leg_count;
use strider_core::precomputation::{ContactPreComputation, PreComputation, Request};
use strider_core::traits::ContactFlagProvider;
use strider_core::types::{ComKinoInput, ComKinoState, GRAVITY, INPUT_DIM, NUM_CONTACT_POINTS};
use strider_mpc::{
    CostDesiredTrajectories, Gait, GaitReceiver, GaitSchedule, GaitType, GaussNewtonCost,
    LockableGaitSchedule, ModeSequenceTemplate, MotionTrackingCost, PointMassComModel,
    QuadrupedKinematics, SolverSynchronizedModule,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Gait scheduling for legged MPC.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a control loop with concurrent gait command producers.
    Simulate(SimulateArgs),

    /// Print crate information.
    Info,
}

#[derive(Args, Clone, Debug)]
struct SimulateArgs {
    /// Number of control cycles.
    #[arg(short = 'n', long, default_value_t = 200)]
    cycles: u32,

    /// Number of producer threads.
    #[arg(short, long, default_value_t = 2)]
    producers: u64,

    /// Control period in seconds.
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Optimization horizon in seconds.
    #[arg(long, default_value_t = 1.0)]
    horizon: f64,

    /// Random seed for the producers.
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// TOML file with a `[tracking_cost]` weight table.
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Run as fast as possible instead of sleeping one period per cycle.
    #[arg(long)]
    no_sleep: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            cycles: 200,
            producers: 2,
            dt: 0.01,
            horizon: 1.0,
            seed: 0,
            weights: None,
            no_sleep: false,
        }
    }
}

impl SimulateArgs {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("dt", self.dt), ("horizon", self.horizon)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!("{value} (must be finite and > 0)"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Robot setup
// ---------------------------------------------------------------------------

const TRACKING_TABLE: &str = "tracking_cost";

fn standing_state() -> DVector<f64> {
    let mut state = ComKinoState {
        position: Vector3::new(0.0, 0.0, 0.42),
        ..ComKinoState::default()
    };
    for leg in 0..NUM_CONTACT_POINTS {
        state.joint_positions[3 * leg + 1] = 0.7;
        state.joint_positions[3 * leg + 2] = -1.4;
    }
    state.to_state_vector()
}

/// All four legs sharing the weight, whatever the schedule says.
fn four_leg_input(mass: f64) -> DVector<f64> {
    ComKinoInput {
        contact_forces: [Vector3::new(0.0, 0.0, mass * GRAVITY / 4.0); NUM_CONTACT_POINTS],
        ..ComKinoInput::default()
    }
    .to_input_vector()
}

fn random_gait(rng: &mut impl Rng) -> Gait {
    let gait_type = match rng.gen_range(0..4) {
        0 => GaitType::Stand,
        1 => GaitType::Trot,
        2 => GaitType::Walk,
        _ => GaitType::Bound,
    };
    gait_type.to_gait()
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Shared view of the controller time, stored as `f64` bits.
#[derive(Debug, Default)]
struct Clock(AtomicU64);

impl Clock {
    fn now(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, time: f64) {
        self.0.store(time.to_bits(), Ordering::Release);
    }
}

fn run_producer(
    id: u64,
    seed: u64,
    horizon: f64,
    receiver: &GaitReceiver,
    clock: &Clock,
    running: &AtomicBool,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(id));
    let mut sent = 0u32;
    while running.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(rng.gen_range(5..50)));
        let now = clock.now();
        let gait = random_gait(&mut rng);
        match rng.gen_range(0..4) {
            0 => receiver.set_gait_after_horizon(gait),
            1 => receiver.set_gait_at_time(gait, now + rng.gen_range(0.0..horizon)),
            2 => receiver.set_gait_after_time(gait, now + rng.gen_range(0.0..horizon)),
            _ => {
                let start = now + rng.gen_range(0.0..horizon);
                let switching_times: Vec<f64> = std::iter::once(0.0)
                    .chain(gait.event_phases().iter().copied())
                    .chain(std::iter::once(1.0))
                    .map(|phase| start + phase * gait.duration())
                    .collect();
                let template =
                    ModeSequenceTemplate::new(switching_times, gait.mode_sequence().to_vec());
                if let Err(err) = receiver.receive_scheduled_mode_sequence_template(&template) {
                    warn!(producer = id, %err, "Template rejected");
                }
            }
        }
        sent += 1;
    }
    info!(producer = id, sent, "Producer stopped");
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_simulate(args: &SimulateArgs) -> Result<(), StriderError> {
    args.validate()?;
    let weights = match &args.weights {
        Some(path) => TrackingWeights::from_file(path, TRACKING_TABLE)?,
        None => TrackingWeights::default(),
    };

    let schedule = GaitSchedule::with_gait(GaitType::Stand.to_gait(), 0.0)?;
    let schedule = Arc::new(LockableGaitSchedule::new(schedule));
    let receiver = Arc::new(GaitReceiver::new(Arc::clone(&schedule)));

    let kinematics = QuadrupedKinematics::default();
    let com_model = PointMassComModel::default();
    let tracking = MotionTrackingCost::new(
        &weights,
        Arc::clone(&schedule) as Arc<dyn ContactFlagProvider>,
        &kinematics,
        &kinematics,
        &com_model,
    )?;
    let cost = GaussNewtonCost::new(tracking, AdSettings::default())?;

    let state = standing_state();
    let input = four_leg_input(com_model.mass);
    let desired = CostDesiredTrajectories::constant(state.clone(), DVector::zeros(INPUT_DIM));
    let mut contacts =
        ContactPreComputation::new(Arc::clone(&schedule) as Arc<dyn ContactFlagProvider>);

    let clock = Arc::new(Clock::default());
    let running = Arc::new(AtomicBool::new(true));
    let producers: Vec<_> = (0..args.producers)
        .map(|id| {
            let receiver = Arc::clone(&receiver);
            let clock = Arc::clone(&clock);
            let running = Arc::clone(&running);
            let (seed, horizon) = (args.seed, args.horizon);
            thread::spawn(move || run_producer(id, seed, horizon, &receiver, &clock, &running))
        })
        .collect();

    info!(
        cycles = args.cycles,
        producers = args.producers,
        dt = args.dt,
        horizon = args.horizon,
        "Starting control loop"
    );

    for cycle in 0..args.cycles {
        let init_time = f64::from(cycle) * args.dt;
        let final_time = init_time + args.horizon;
        clock.set(init_time);

        if let Err(err) = receiver.pre_solver_run(init_time, final_time, &state) {
            warn!(cycle, %err, "Gait update rejected");
        }

        let modes = schedule.mode_schedule(init_time, final_time);
        contacts.request(Request::COST, init_time, &state, &input);
        let value = cost.value(init_time, &state, &input, &desired);
        info!(
            cycle,
            time = init_time,
            stance_legs = stance_leg_count(contacts.contact_flags()),
            modes = ?modes.mode_sequence,
            events = ?modes.event_times,
            cost = value,
            "Cycle"
        );

        receiver.post_solver_run();
        if !args.no_sleep {
            thread::sleep(Duration::from_secs_f64(args.dt));
        }
    }

    running.store(false, Ordering::Release);
    for producer in producers {
        if producer.join().is_err() {
            error!("Producer thread panicked");
        }
    }

    let stats = receiver.stats();
    println!(
        "\ntotal: cycles={}, received={}, overwritten={}, applied={}, failed={}",
        args.cycles, stats.received, stats.overwritten, stats.applied, stats.failed
    );
    println!("schedule segments: {}", schedule.snapshot().segments().len());
    Ok(())
}

fn run_info() {
    println!("strider v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  strider-core {}", env!("CARGO_PKG_VERSION"));
    println!("  strider-mpc  {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("gait presets:");
    for gait_type in [GaitType::Stand, GaitType::Trot, GaitType::Walk, GaitType::Bound] {
        println!("  {gait_type:?}: {}", gait_type.to_gait());
    }
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Simulate(args)) => run_simulate(&args),
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        // Default: short simulation with defaults
        None => run_simulate(&SimulateArgs::default()),
    };

    if let Err(err) = result {
        error!(%err, "strider failed");
        std::process::exit(1);
    }
}
