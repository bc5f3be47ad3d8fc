//! Gyrodyne attitude-control demo CLI.
//!
//! Provides two modes of operation:
//! - `simulate`: run the estimation and damping loop against a synthetic
//!   vehicle and print what the stack identified
//! - `info`: print workspace crate versions

use clap::{Parser, Subcommand};
use nalgebra::{UnitQuaternion, Vector3};

use gyrodyne_control::damper::RateDamper;
use gyrodyne_core::axis::RotationAxis;
use gyrodyne_core::config::GyrodyneConfig;
use gyrodyne_core::snapshot::{
    PartSnapshot, PilotInput, ReactionWheel, VehicleId, VehicleSnapshot,
};
use gyrodyne_model::vehicle::VehicleModel;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Gyrodyne vehicle attitude estimation and control stack.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a gyrodyne TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the estimation and damping loop on a synthetic vehicle.
    Simulate {
        /// Number of physics ticks.
        #[arg(short, long, default_value_t = 600)]
        ticks: u32,

        /// Fixed timestep in seconds.
        #[arg(short, long, default_value_t = 0.02)]
        dt: f64,

        /// True yaw control authority of the plant (rad/s² per unit input).
        #[arg(short, long, default_value_t = 2.5)]
        gain: f64,

        /// Initial yaw rate in rad/s.
        #[arg(short, long, default_value_t = 0.8)]
        rate: f64,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Synthetic vehicle
// ---------------------------------------------------------------------------

const VEHICLE: VehicleId = VehicleId(1);

/// Four point masses in a cross plus a reaction-wheel hub, spinning about
/// the yaw axis at `rate` rad/s.
fn synthetic_snapshot(rate: f64) -> VehicleSnapshot {
    let arms = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, -2.0, 0.0),
    ];
    let spin = Vector3::new(0.0, 0.0, rate);

    let mut parts: Vec<PartSnapshot> = arms
        .iter()
        .zip(1u64..)
        .map(|(position, id)| {
            let mut part = PartSnapshot::point_mass(id, VEHICLE, 0.5, *position);
            part.velocity = spin.cross(position);
            part
        })
        .collect();

    let mut hub = PartSnapshot::point_mass(99, VEHICLE, 2.0, Vector3::zeros());
    hub.reaction_wheel = Some(ReactionWheel {
        torque: Vector3::new(5.0, 5.0, 5.0),
        active: true,
    });
    parts.push(hub);

    VehicleSnapshot {
        id: VEHICLE,
        reference_rotation: UnitQuaternion::identity(),
        frame_angular_velocity: Vector3::zeros(),
        surface_velocity: Vector3::zeros(),
        landed: false,
        parts,
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_simulate(config: &GyrodyneConfig, ticks: u32, dt: f64, gain: f64, initial_rate: f64) {
    let mut model = VehicleModel::new(config);
    let mut damper = RateDamper::new(&config.damper.yaw);

    let mut rate = initial_rate;
    for tick in 0..ticks {
        model.tick(&synthetic_snapshot(rate), dt);
        let measured = model.state().angular_velocity.z;

        let command = damper.update(measured, 0.0, 0.0, dt).unwrap_or(0.0);
        model.record_controls(&PilotInput::from_commands(0.0, 0.0, command));

        // Plant: yaw acceleration responds linearly to the actuated surface.
        let actuated = model.actuated_commands()[RotationAxis::Yaw];
        rate += dt * gain * actuated;

        if tick % 50 == 0 {
            println!(
                "tick {tick:4}: rate={measured:+.5} rad/s  cmd={command:+.4}  surface={actuated:+.4}"
            );
        }
    }

    let yaw = model.axis(RotationAxis::Yaw);
    let state = model.state();
    println!();
    println!("vehicle: mass={:.2} t, inertia diag=({:.2}, {:.2}, {:.2})", state.mass,
        state.inertia.x, state.inertia.y, state.inertia.z);
    println!(
        "reaction torque: ({:.1}, {:.1}, {:.1}) kN·m",
        state.reaction_torque.x, state.reaction_torque.y, state.reaction_torque.z
    );
    println!(
        "yaw authority: avg={:.3}, instant={:.3} ({} accepted samples; plant gain {gain})",
        yaw.authority(),
        yaw.authority_instant(),
        yaw.authority_sample_count()
    );
    println!("residual yaw rate: {rate:+.6} rad/s");
}

fn run_info() {
    println!("gyrodyne v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  gyrodyne-core    {}", env!("CARGO_PKG_VERSION"));
    println!("  gyrodyne-control {}", env!("CARGO_PKG_VERSION"));
    println!("  gyrodyne-model   {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match GyrodyneConfig::from_file(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("failed to load {}: {error}", path.display());
                std::process::exit(1);
            }
        },
        None => GyrodyneConfig::default(),
    };

    match cli.command {
        Some(Commands::Simulate {
            ticks,
            dt,
            gain,
            rate,
        }) => run_simulate(&config, ticks, dt, gain, rate),
        Some(Commands::Info) => run_info(),
        None => {
            // Default: simulate with defaults.
            run_simulate(&config, 600, 0.02, 2.5, 0.8);
        }
    }
}
