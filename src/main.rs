use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use vtol_sim::config::SimSettings;
use vtol_sim::dynamics::VehicleState;
use vtol_sim::io::{csv, CsvSink, FanOut, LogSink};
use vtol_sim::physics::actuators::Encoding;
use vtol_sim::physics::atmosphere;
use vtol_sim::sim::Runtime;

/// Real-time VTOL flight dynamics and sensor simulator.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Simulation settings (YAML).
    #[arg(short, long)]
    config: PathBuf,

    /// Wall-clock run time, seconds.
    #[arg(short, long, default_value_t = 10.0)]
    duration: f64,

    /// Record every published sensor message to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Record the vehicle state at 10 Hz of simulated time to this CSV file.
    #[arg(long)]
    trajectory: Option<PathBuf>,

    /// Arm and hold this normalized throttle on the four lift motors.
    #[arg(long, value_parser = parse_throttle)]
    throttle: Option<f64>,
}

fn parse_throttle(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("throttle must be within [0, 1], got {}", v))
    }
}

const SAMPLE_PERIOD: f64 = 0.1; // s, simulated

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = SimSettings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;

    let mut sink = FanOut::new().with(LogSink);
    if let Some(path) = &cli.csv {
        let recorder = CsvSink::create(path).with_context(|| format!("creating {}", path.display()))?;
        sink = sink.with(recorder);
    }

    let runtime = Runtime::start(&settings, Box::new(sink)).context("starting simulation")?;
    let commands = runtime.commands();
    if cli.throttle.is_some() {
        commands.set_armed(true)?;
    }

    // -----------------------------------------------------------------------
    // Drive the run
    // -----------------------------------------------------------------------
    let start = Instant::now();
    let duration = Duration::from_secs_f64(cli.duration.max(0.0));
    let command_period = Duration::from_secs_f64(settings.physics_period() / settings.real_time_factor);
    let mut samples: Vec<VehicleState> = Vec::new();
    let mut next_sample = 0.0;

    while start.elapsed() < duration {
        if let Some(u) = cli.throttle {
            commands.send_actuators(&[u; 4], Encoding::Normalized, start.elapsed().as_secs_f64())?;
        }
        let snapshot = runtime.snapshot();
        if snapshot.time >= next_sample {
            samples.push(snapshot.state.clone());
            next_sample = snapshot.time + SAMPLE_PERIOD;
        }
        thread::sleep(command_period);
    }

    let last = runtime.snapshot();
    let wall = start.elapsed().as_secs_f64();
    runtime.shutdown();
    samples.push(last.state.clone());

    if let Some(path) = &cli.trajectory {
        csv::write_trajectory_file(path, &samples).with_context(|| format!("writing {}", path.display()))?;
    }

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    let max_height = samples.iter().map(|s| s.height()).fold(0.0_f64, f64::max);
    let max_speed = samples.iter().map(|s| s.velocity.norm()).fold(0.0_f64, f64::max);
    let s = &last.state;
    let (roll, pitch, yaw) = s.euler();
    let air = atmosphere::isa(settings.alt_ref + s.height());

    println!();
    println!("====================================================================");
    println!("  VTOL SIMULATION — {} / {}", settings.airframe, settings.dynamics);
    println!("====================================================================");
    println!();
    println!("  Setup");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Reference:     {:>9.5} deg  {:>9.5} deg  {:>7.1} m",
        settings.lat_ref, settings.lon_ref, settings.alt_ref
    );
    println!(
        "  Physics:       {:>8.0} Hz    Publish:      {:>8.0} Hz",
        settings.physics_rate_hz, settings.publish_rate_hz
    );
    println!(
        "  Clock:         {:>8}       RTF:          {:>8.2}",
        format!("{:?}", settings.clock),
        settings.real_time_factor
    );
    println!();

    println!("  Final State   t={:.2}s   {}", last.time, last.arming);
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Position NED:  {:>8.2} {:>8.2} {:>8.2} m",
        s.position.x, s.position.y, s.position.z
    );
    println!(
        "  Velocity NED:  {:>8.2} {:>8.2} {:>8.2} m/s",
        s.velocity.x, s.velocity.y, s.velocity.z
    );
    println!(
        "  Attitude:      roll {:>6.1}  pitch {:>6.1}  yaw {:>6.1} deg",
        roll.to_degrees(),
        pitch.to_degrees(),
        yaw.to_degrees()
    );
    println!(
        "  Air data:      {:>8.2} hPa   {:>8.2} K",
        air.pressure, air.temperature
    );
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Max height:    {:>8.2} m", max_height);
    println!("  Max speed:     {:>8.2} m/s", max_speed);
    println!(
        "  Sim time:      {:>8.2} s     Wall time:    {:>8.2} s",
        last.time, wall
    );
    println!();
    println!("  Physics ticks: {}, samples: {}", last.version, samples.len());
    println!("====================================================================");
    println!();
    Ok(())
}
