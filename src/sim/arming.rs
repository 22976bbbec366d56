use std::fmt;

use crate::dynamics::CalibrationMode;

/// What the physics loop does with the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmingState {
    Calibrating(CalibrationMode),
    Armed,
    #[default]
    Disarmed,
}

impl fmt::Display for ArmingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmingState::Calibrating(mode) => write!(f, "calibrating ({})", mode),
            ArmingState::Armed => f.write_str("armed"),
            ArmingState::Disarmed => f.write_str("disarmed"),
        }
    }
}

/// Arm flag plus calibration selector. A non-idle calibration overrides the
/// arm flag until idle is selected again.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmingMachine {
    armed: bool,
    calibration: CalibrationMode,
}

impl ArmingMachine {
    pub fn state(&self) -> ArmingState {
        if !self.calibration.is_idle() {
            ArmingState::Calibrating(self.calibration)
        } else if self.armed {
            ArmingState::Armed
        } else {
            ArmingState::Disarmed
        }
    }

    pub fn set_armed(&mut self, armed: bool) -> ArmingState {
        let before = self.state();
        self.armed = armed;
        self.transition(before)
    }

    pub fn set_calibration(&mut self, mode: CalibrationMode) -> ArmingState {
        let before = self.state();
        self.calibration = mode;
        self.transition(before)
    }

    fn transition(&self, before: ArmingState) -> ArmingState {
        let after = self.state();
        if after != before {
            log::info!("{} -> {}", before, after);
        }
        after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::Orientation;

    #[test]
    fn starts_disarmed() {
        assert_eq!(ArmingMachine::default().state(), ArmingState::Disarmed);
    }

    #[test]
    fn arm_flag_sets_rather_than_toggles() {
        let mut m = ArmingMachine::default();
        assert_eq!(m.set_armed(true), ArmingState::Armed);
        assert_eq!(m.set_armed(true), ArmingState::Armed);
        assert_eq!(m.set_armed(false), ArmingState::Disarmed);
    }

    #[test]
    fn calibration_overrides_until_idle() {
        let mut m = ArmingMachine::default();
        m.set_armed(true);
        let mode = CalibrationMode::Magnetometer(Orientation::Normal);
        assert_eq!(m.set_calibration(mode), ArmingState::Calibrating(mode));
        assert_eq!(m.set_armed(false), ArmingState::Calibrating(mode));
        assert_eq!(m.set_calibration(CalibrationMode::Idle), ArmingState::Disarmed);
    }
}
