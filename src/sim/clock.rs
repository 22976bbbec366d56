use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Upper bound on a wall-clock step, in nominal periods.
pub const MAX_STEP_PERIODS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Every tick advances time by exactly one nominal period.
    #[default]
    Simulated,
    /// Ticks advance by the measured interval times the real-time factor.
    Wall,
}

/// Coordinator time source. Fixed mode for the whole run.
#[derive(Debug, Clone)]
pub struct SimClock {
    mode: ClockMode,
    period: f64, // s, nominal physics step
    real_time_factor: f64,
    time: f64,
    last_wall: Option<Instant>,
}

impl SimClock {
    pub fn new(mode: ClockMode, period: f64, real_time_factor: f64) -> Self {
        Self {
            mode,
            period,
            real_time_factor,
            time: 0.0,
            last_wall: None,
        }
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn now(&self) -> f64 {
        self.time
    }

    /// Wall time between loop firings.
    pub fn wall_period(&self) -> Duration {
        Duration::from_secs_f64(self.period / self.real_time_factor)
    }

    /// Step length for the next tick. Does not advance the clock.
    pub fn next_dt(&self, wall_now: Instant) -> f64 {
        match self.mode {
            ClockMode::Simulated => self.period,
            ClockMode::Wall => match self.last_wall {
                // First tick has no measured interval.
                None => self.period,
                Some(last) => {
                    let measured = wall_now.saturating_duration_since(last).as_secs_f64();
                    (measured * self.real_time_factor).min(MAX_STEP_PERIODS * self.period)
                }
            },
        }
    }

    /// Commit a step of `dt` seconds taken at `wall_now`.
    pub fn advance(&mut self, dt: f64, wall_now: Instant) {
        self.time += dt;
        self.last_wall = Some(wall_now);
    }

    /// Note a tick that did not integrate. Wall mode still consumes the
    /// interval so the next step does not absorb it.
    pub fn hold(&mut self, wall_now: Instant) {
        self.last_wall = Some(wall_now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_steps_are_nominal() {
        let mut c = SimClock::new(ClockMode::Simulated, 0.004, 1.0);
        let t0 = Instant::now();
        for i in 0..250 {
            let now = t0 + Duration::from_millis(i * 37);
            let dt = c.next_dt(now);
            assert_eq!(dt, 0.004);
            c.advance(dt, now);
        }
        assert!((c.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn wall_steps_scale_with_real_time_factor() {
        let mut c = SimClock::new(ClockMode::Wall, 0.004, 2.0);
        let t0 = Instant::now();
        c.advance(c.next_dt(t0), t0);
        let dt = c.next_dt(t0 + Duration::from_millis(3));
        assert!((dt - 0.006).abs() < 1e-9);
    }

    #[test]
    fn wall_steps_are_clamped() {
        let mut c = SimClock::new(ClockMode::Wall, 0.004, 1.0);
        let t0 = Instant::now();
        c.advance(c.next_dt(t0), t0);
        let dt = c.next_dt(t0 + Duration::from_secs(1));
        assert!((dt - 0.016).abs() < 1e-12);
    }

    #[test]
    fn wall_period_shrinks_when_faster_than_real_time() {
        let c = SimClock::new(ClockMode::Simulated, 0.004, 4.0);
        assert_eq!(c.wall_period(), Duration::from_millis(1));
    }
}
