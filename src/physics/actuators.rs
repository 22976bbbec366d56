use serde::{Deserialize, Serialize};

use crate::vehicle::{ChannelSpec, CHANNELS};

// ---------------------------------------------------------------------------
// Command vector
// ---------------------------------------------------------------------------

/// How the setpoints of a [`CommandVector`] are expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Motors in [0, 1], control surfaces in [-1, 1].
    #[default]
    Normalized,
    /// Motors in rad/s, control surfaces in degrees.
    Physical,
}

/// Eight ordered actuator setpoints. Replaced as a whole, never per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommandVector {
    pub axes: [f64; CHANNELS],
    pub encoding: Encoding,
}

impl CommandVector {
    pub fn new(axes: [f64; CHANNELS], encoding: Encoding) -> Self {
        Self { axes, encoding }
    }

    /// Copy of `self` with the leading channels replaced by `axes`.
    /// Channels beyond `axes.len()` keep their previous value.
    pub fn merged(&self, axes: &[f64], encoding: Encoding) -> Self {
        let mut next = *self;
        for (slot, &v) in next.axes.iter_mut().zip(axes) {
            *slot = v;
        }
        next.encoding = encoding;
        next
    }
}

// ---------------------------------------------------------------------------
// Actuator dynamics
// ---------------------------------------------------------------------------

/// Map a command into physical units (rad/s, degrees) through the
/// airframe's per-channel affine map. Non-finite setpoints become NaN and are
/// ignored by [`update`].
pub fn to_physical(specs: &[ChannelSpec; CHANNELS], cmd: &CommandVector) -> [f64; CHANNELS] {
    let mut out = [0.0; CHANNELS];
    for ((slot, spec), &raw) in out.iter_mut().zip(specs).zip(&cmd.axes) {
        *slot = match cmd.encoding {
            Encoding::Normalized => (raw + spec.offset) * spec.scale,
            Encoding::Physical => raw,
        };
    }
    out
}

/// Advance effective actuator positions toward `target` over `dt` seconds.
///
/// Per channel: clamp to [min, max], limit the change to `rate_limit * dt`,
/// then lag toward that rate-limited target with the channel time constant.
/// The result always lies in [min, max] and moves at most `rate_limit * dt`.
pub fn update(
    specs: &[ChannelSpec; CHANNELS],
    current: &[f64; CHANNELS],
    target: &[f64; CHANNELS],
    dt: f64,
) -> [f64; CHANNELS] {
    let mut next = *current;
    if !(dt > 0.0 && dt.is_finite()) {
        return next;
    }
    for (i, spec) in specs.iter().enumerate() {
        let eff = current[i].clamp(spec.min, spec.max);
        let wanted = if target[i].is_finite() { target[i] } else { eff };
        let clamped = wanted.clamp(spec.min, spec.max);

        let max_delta = spec.rate_limit * dt;
        let limited = eff + (clamped - eff).clamp(-max_delta, max_delta);

        let alpha = if spec.time_constant > 0.0 {
            1.0 - (-dt / spec.time_constant).exp()
        } else {
            1.0
        };
        next[i] = (eff + (limited - eff) * alpha).clamp(spec.min, spec.max);
    }
    next
}

/// Resting position of every channel.
pub fn rest(specs: &[ChannelSpec; CHANNELS]) -> [f64; CHANNELS] {
    let mut out = [0.0; CHANNELS];
    for (slot, spec) in out.iter_mut().zip(specs) {
        *slot = spec.rest();
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn normalized_commands_map_per_airframe() {
        let vtol = presets::innopolis_vtol();
        let cmd = CommandVector::new([0.5, 0.5, 0.5, 0.5, -1.0, 0.5, 0.0, 1.0], Encoding::Normalized);
        let p = to_physical(&vtol.channels, &cmd);
        assert!((p[0] - 500.0).abs() < 1e-9);
        assert!((p[4] + 20.0).abs() < 1e-9);
        assert!((p[5] - 10.0).abs() < 1e-9);
        assert!((p[7] - 1000.0).abs() < 1e-9);

        // Iris ignores the fixed-wing channels entirely.
        let iris = presets::iris();
        let p = to_physical(&iris.channels, &cmd);
        assert!(p[4..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn physical_commands_pass_through() {
        let iris = presets::iris();
        let cmd = CommandVector::new([300.0; CHANNELS], Encoding::Physical);
        assert_eq!(to_physical(&iris.channels, &cmd)[2], 300.0);
    }

    #[test]
    fn merge_keeps_missing_channels() {
        let prev = CommandVector::new([0.1; CHANNELS], Encoding::Normalized);
        let next = prev.merged(&[0.9, 0.8], Encoding::Normalized);
        assert_eq!(next.axes[0], 0.9);
        assert_eq!(next.axes[1], 0.8);
        assert!(next.axes[2..].iter().all(|&v| v == 0.1));
    }

    #[test]
    fn output_stays_in_bounds_and_rate_limited() {
        let specs = presets::innopolis_vtol().channels;
        let mut rng = StdRng::seed_from_u64(7);
        let mut eff = rest(&specs);
        for _ in 0..5_000 {
            let dt = rng.gen_range(0.001..0.02);
            let mut target = [0.0; CHANNELS];
            for t in target.iter_mut() {
                *t = rng.gen_range(-5000.0..5000.0);
            }
            let next = update(&specs, &eff, &target, dt);
            for (i, s) in specs.iter().enumerate() {
                assert!(next[i] >= s.min && next[i] <= s.max, "ch {} = {}", i, next[i]);
                let step = (next[i] - eff[i]).abs();
                assert!(step <= s.rate_limit * dt + 1e-9, "ch {} stepped {}", i, step);
            }
            eff = next;
        }
    }

    #[test]
    fn lag_converges_to_target() {
        let specs = presets::iris().channels;
        let mut eff = rest(&specs);
        let mut target = [0.0; CHANNELS];
        target[0] = 600.0;
        for _ in 0..1_000 {
            eff = update(&specs, &eff, &target, 0.004);
        }
        assert!((eff[0] - 600.0).abs() < 1e-3, "settled at {}", eff[0]);
    }

    #[test]
    fn first_order_response_without_rate_limit() {
        let mut specs = [ChannelSpec::UNUSED; CHANNELS];
        specs[0] = ChannelSpec {
            min: 0.0,
            max: 10.0,
            rate_limit: 1e9,
            time_constant: 0.1,
            scale: 1.0,
            offset: 0.0,
        };
        let mut target = [0.0; CHANNELS];
        target[0] = 10.0;
        let next = update(&specs, &[0.0; CHANNELS], &target, 0.1);
        let expected = 10.0 * (1.0 - (-1.0_f64).exp());
        assert!((next[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn non_finite_target_holds_position() {
        let specs = presets::iris().channels;
        let mut cur = [0.0; CHANNELS];
        cur[1] = 250.0;
        let mut target = cur;
        target[1] = f64::NAN;
        let next = update(&specs, &cur, &target, 0.01);
        assert_eq!(next[1], 250.0);
    }
}
