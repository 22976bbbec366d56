use std::time::Instant;

use crossbeam::channel::Receiver;

use crate::dynamics::{DynamicsModel, ForcesSnapshot, VehicleState};
use crate::physics::actuators::CommandVector;
use crate::sim::arming::{ArmingMachine, ArmingState};
use crate::sim::clock::{ClockMode, SimClock};
use crate::sim::command::Command;

/// Immutable view of one completed physics tick.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: u64,
    pub time: f64, // coordinator clock, s
    pub state: VehicleState,
    pub forces: ForcesSnapshot,
    pub arming: ArmingState,
}

/// Single owner of the dynamics model. Applies whole inbound messages, then
/// advances one tick according to the arming state.
#[derive(Debug)]
pub struct Coordinator {
    dynamics: DynamicsModel,
    arming: ArmingMachine,
    command: CommandVector,
    fresh_command: bool,
    clock: SimClock,
    lockstep: bool,
    version: u64,
}

impl Coordinator {
    pub fn new(dynamics: DynamicsModel, clock: SimClock, lockstep: bool) -> Self {
        if lockstep && clock.mode() != ClockMode::Simulated {
            log::warn!("lockstep ignored with the wall clock");
        }
        Self {
            dynamics,
            arming: ArmingMachine::default(),
            command: CommandVector::default(),
            fresh_command: false,
            clock,
            lockstep,
            version: 0,
        }
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Actuators { axes, count, encoding, .. } => {
                self.command = self.command.merged(&axes[..count], encoding);
                self.fresh_command = true;
            }
            Command::Arm(armed) => {
                self.arming.set_armed(armed);
            }
            Command::Calibration(mode) => {
                self.arming.set_calibration(mode);
            }
        }
    }

    /// Apply every queued message. Returns how many were applied.
    pub fn drain(&mut self, rx: &Receiver<Command>) -> usize {
        let mut n = 0;
        for cmd in rx.try_iter() {
            self.apply(cmd);
            n += 1;
        }
        n
    }

    /// Advance the model by `dt` in the current arming state.
    pub fn step(&mut self, dt: f64) {
        match self.arming.state() {
            ArmingState::Armed => self.dynamics.process(dt, &self.command),
            ArmingState::Disarmed => self.dynamics.land(dt),
            ArmingState::Calibrating(mode) => self.dynamics.calibrate(mode, dt),
        }
        self.fresh_command = false;
        self.version += 1;
    }

    /// One loop firing. Returns `false` when lockstep held the tick.
    pub fn tick(&mut self, wall_now: Instant) -> bool {
        if self.waiting_for_command() {
            self.clock.hold(wall_now);
            return false;
        }
        let dt = self.clock.next_dt(wall_now);
        self.step(dt);
        self.clock.advance(dt, wall_now);
        true
    }

    fn waiting_for_command(&self) -> bool {
        self.lockstep
            && self.clock.mode() == ClockMode::Simulated
            && self.arming.state() == ArmingState::Armed
            && !self.fresh_command
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            time: self.clock.now(),
            state: self.dynamics.state().clone(),
            forces: self.dynamics.forces(),
            arming: self.arming.state(),
        }
    }

    pub fn arming(&self) -> ArmingState {
        self.arming.state()
    }

    pub fn command(&self) -> &CommandVector {
        &self.command
    }

    pub fn dynamics(&self) -> &DynamicsModel {
        &self.dynamics
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{CalibrationMode, DynamicsKind};
    use crate::physics::actuators::Encoding;
    use crate::vehicle::{presets, CoefficientTables, CHANNELS};
    use nalgebra::{UnitQuaternion, Vector3};
    use std::sync::Arc;

    const DT: f64 = 0.004; // 250 Hz

    fn iris(lockstep: bool) -> Coordinator {
        let mut model = DynamicsModel::new(
            DynamicsKind::Multicopter,
            Arc::new(presets::iris()),
            Arc::new(CoefficientTables::innopolis_vtol()),
            0.0,
        )
        .unwrap();
        // [0, 0, -5, 0, 0, 0, 1]
        model.set_initial_pose(Vector3::new(0.0, 0.0, -5.0), UnitQuaternion::identity());
        Coordinator::new(model, SimClock::new(ClockMode::Simulated, DT, 1.0), lockstep)
    }

    fn actuators(axes: &[f64]) -> Command {
        let mut padded = [0.0; CHANNELS];
        padded[..axes.len()].copy_from_slice(axes);
        Command::Actuators {
            axes: padded,
            count: axes.len(),
            encoding: Encoding::Normalized,
            timestamp: 0.0,
        }
    }

    // Normalized motor command balancing gravity with four equal rotors.
    fn hover_command(c: &Coordinator) -> f64 {
        const IRIS_THRUST_COEFF: f64 = 8.548_58e-6;
        let p = c.dynamics().params();
        let per_motor = p.effective_mass() * p.gravity / 4.0;
        let speed = (per_motor / IRIS_THRUST_COEFF).sqrt();
        speed / p.channels[0].scale - p.channels[0].offset
    }

    #[test]
    fn iris_hover_holds_position_and_attitude() {
        let mut c = iris(false);
        let u = hover_command(&c);
        c.apply(Command::Arm(true));
        let mut t = Instant::now();
        for _ in 0..250 {
            c.apply(actuators(&[u, u, u, u]));
            t += std::time::Duration::from_millis(4);
            assert!(c.tick(t));
        }
        let snap = c.snapshot();
        assert_eq!(snap.arming, ArmingState::Armed);
        assert!((snap.time - 1.0).abs() < 1e-9);
        let s = &snap.state;
        let horizontal = s.position.x.hypot(s.position.y);
        assert!(horizontal < 1e-3, "drift {}", horizontal);
        let (roll, pitch, _) = s.euler();
        assert!(roll.abs() < 1e-3 && pitch.abs() < 1e-3, "roll {} pitch {}", roll, pitch);
        assert!(s.position.z < 0.0, "still airborne");
    }

    #[test]
    fn disarm_lands_without_attitude_jump() {
        let mut c = iris(false);
        let u = hover_command(&c);
        c.apply(Command::Arm(true));
        c.apply(actuators(&[u, u * 1.02, u, u * 1.02]));
        for _ in 0..50 {
            c.step(DT);
        }
        let before = c.snapshot().state.attitude;

        c.apply(Command::Arm(false));
        c.step(DT);
        let after = c.snapshot();
        assert_eq!(after.arming, ArmingState::Disarmed);
        assert!(!after.state.armed);
        let max_step = c.dynamics().land_profile().max_level_rate * DT;
        assert!(before.angle_to(&after.state.attitude) <= max_step + 1e-9);
    }

    #[test]
    fn disarm_mid_climb_keeps_imu_plausible() {
        let mut c = iris(false);
        c.apply(Command::Arm(true));
        c.apply(actuators(&[1.0; 4]));
        for _ in 0..250 {
            c.step(DT);
        }
        let climbing = c.snapshot().state.velocity.z;
        assert!(climbing < -5.0, "vz {}", climbing);

        c.apply(Command::Arm(false));
        c.step(DT);
        let s = c.snapshot().state;
        let limit = c.dynamics().land_profile().max_vertical_accel;
        assert!((s.velocity.z - climbing).abs() / DT <= limit + 1e-9);

        let g = Vector3::new(0.0, 0.0, c.dynamics().params().gravity);
        let reading = crate::sensors::imu::imu(&s, &g);
        assert!(reading.accel.norm() < 2.0 * g.z, "imu {:?}", reading.accel);
    }

    #[test]
    fn missing_channels_keep_previous_values() {
        let mut c = iris(false);
        c.apply(actuators(&[0.1, 0.2, 0.3, 0.4]));
        c.apply(actuators(&[0.9]));
        assert_eq!(&c.command().axes[..4], &[0.9, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn calibration_takes_precedence_over_arming() {
        let mut c = iris(false);
        c.apply(Command::Arm(true));
        c.apply(Command::Calibration(CalibrationMode::Airspeed));
        c.step(DT);
        let s = c.snapshot();
        assert_eq!(s.arming, ArmingState::Calibrating(CalibrationMode::Airspeed));
        assert_eq!(s.state.calibration, CalibrationMode::Airspeed);
        c.apply(Command::Calibration(CalibrationMode::Idle));
        assert_eq!(c.arming(), ArmingState::Armed);
    }

    #[test]
    fn lockstep_waits_for_actuator_messages() {
        let mut c = iris(true);
        c.apply(Command::Arm(true));
        let t = Instant::now();
        assert!(!c.tick(t));
        assert!(!c.tick(t));
        assert_eq!(c.snapshot().version, 0);
        assert_eq!(c.clock().now(), 0.0);

        c.apply(actuators(&[0.5; 4]));
        assert!(c.tick(t));
        assert!(!c.tick(t));
        assert_eq!(c.snapshot().version, 1);
        assert!((c.clock().now() - DT).abs() < 1e-12);
    }

    #[test]
    fn drain_applies_messages_in_order() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut c = iris(false);
        tx.send(Command::Arm(true)).unwrap();
        tx.send(Command::Arm(false)).unwrap();
        tx.send(actuators(&[0.3])).unwrap();
        assert_eq!(c.drain(&rx), 3);
        assert_eq!(c.arming(), ArmingState::Disarmed);
        assert_eq!(c.command().axes[0], 0.3);
    }
}
