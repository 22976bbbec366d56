use std::time::Instant;

use crossbeam::channel::unbounded;
use nalgebra::{UnitQuaternion, Vector3};
use vtol_sim::config::{InitialPose, SimSettings};
use vtol_sim::dynamics::DynamicsKind;
use vtol_sim::io::ChannelSink;
use vtol_sim::sensors::{Reading, SensorKind};
use vtol_sim::sim::{build_dynamics, build_publisher, ClockMode, Command, Coordinator, SimClock};
use vtol_sim::vehicle::Airframe;

/// Runs the magnetometer calibration spin and prints the heading sweep seen
/// by the magnetometer.
fn main() {
    let pose = InitialPose { position: Vector3::zeros(), attitude: UnitQuaternion::identity() };
    let settings = SimSettings::new(
        Airframe::InnopolisVtol,
        DynamicsKind::InnoVtol,
        [55.7531, 48.7510, -6.5],
        pose,
    );
    let model = build_dynamics(&settings).expect("preset settings are valid");
    let (tx, rx) = unbounded();
    let mut publisher = build_publisher(&settings, model.params(), Box::new(ChannelSink::new(tx)))
        .expect("preset settings are valid");

    let clock = SimClock::new(ClockMode::Simulated, settings.physics_period(), 1.0);
    let mut coordinator = Coordinator::new(model, clock, false);
    coordinator.apply(Command::Calibration(
        1u8.try_into().expect("code 1 is magnetometer, normal orientation"),
    ));

    let now = Instant::now();
    for _ in 0..(settings.physics_rate_hz as usize * 13) {
        coordinator.tick(now);
        publisher.publish(&coordinator.snapshot());
    }

    println!("{:>8}  {:>8}  {:>8}  {:>8}", "t (s)", "Bx", "By", "Bz");
    for msg in rx.try_iter().filter(|m| m.kind() == SensorKind::MagneticField).step_by(20) {
        if let Reading::MagneticField { field } = msg.reading {
            println!("{:>8.2}  {:>8.4}  {:>8.4}  {:>8.4}", msg.time, field.x, field.y, field.z);
        }
    }
}
