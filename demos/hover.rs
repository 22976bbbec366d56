use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use nalgebra::{UnitQuaternion, Vector3};
use vtol_sim::dynamics::{DynamicsKind, DynamicsModel};
use vtol_sim::io::csv;
use vtol_sim::physics::actuators::Encoding;
use vtol_sim::sim::{ClockMode, Command, Coordinator, SimClock};
use vtol_sim::vehicle::{presets, CoefficientTables, CHANNELS};

fn main() {
    let params = Arc::new(presets::iris());
    let tables = Arc::new(CoefficientTables::innopolis_vtol());
    let mut model = DynamicsModel::new(DynamicsKind::Multicopter, params, tables, 0.0)
        .expect("iris preset is valid");
    model.set_initial_pose(Vector3::new(0.0, 0.0, -5.0), UnitQuaternion::identity());

    let dt = 0.004;
    let mut coordinator = Coordinator::new(model, SimClock::new(ClockMode::Simulated, dt, 1.0), false);
    coordinator.apply(Command::Arm(true));

    let mut axes = [0.0; CHANNELS];
    axes[..4].copy_from_slice(&[0.6; 4]);
    let command = Command::Actuators { axes, count: 4, encoding: Encoding::Normalized, timestamp: 0.0 };

    println!("Simulating iris at 60% throttle for 5 s ...");
    let mut trajectory = Vec::new();
    let now = Instant::now();
    for i in 0..1250 {
        coordinator.apply(command.clone());
        coordinator.tick(now);
        if i % 25 == 0 {
            trajectory.push(coordinator.snapshot().state);
        }
    }

    let last = coordinator.snapshot();
    println!("Height: {:.1} m", last.state.height());
    println!("Climb rate: {:.2} m/s", -last.state.velocity.z);

    csv::write_trajectory_file(Path::new("hover_trajectory.csv"), &trajectory)
        .expect("Failed to write CSV");
    println!("Exported: hover_trajectory.csv");
}
