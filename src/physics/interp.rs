// ---------------------------------------------------------------------------
// Table lookup primitives
// ---------------------------------------------------------------------------
//
// All lookups clamp to the covered range. Out-of-range queries land on the
// first or last interpolation band instead of extrapolating.

/// Index of the lower row of the band bracketing `value` on a
/// non-decreasing axis. Always in `0..=axis.len() - 2` for axes with two or
/// more points, 0 otherwise.
pub fn find_row(axis: &[f64], value: f64) -> usize {
    if axis.len() < 2 {
        return 0;
    }
    // First index whose value is strictly greater than `value`.
    let upper = axis.partition_point(|&x| x <= value);
    upper.saturating_sub(1).min(axis.len() - 2)
}

/// Fractional position of `value` inside the band starting at `row`,
/// clamped to [0, 1].
pub fn band_fraction(axis: &[f64], row: usize, value: f64) -> f64 {
    if axis.len() < 2 {
        return 0.0;
    }
    let (lo, hi) = (axis[row], axis[row + 1]);
    let width = hi - lo;
    if width.abs() < f64::EPSILON {
        return 0.0;
    }
    ((value - lo) / width).clamp(0.0, 1.0)
}

pub fn lerp(a: f64, b: f64, f: f64) -> f64 {
    a + f * (b - a)
}

/// Horner evaluation, coefficients ordered highest degree first.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// 1-D clamped linear interpolation of `values` over `axis`.
pub fn interp1(axis: &[f64], values: &[f64], x: f64) -> f64 {
    match axis.len() {
        0 => 0.0,
        1 => values[0],
        _ => {
            let row = find_row(axis, x);
            let f = band_fraction(axis, row, x);
            lerp(values[row], values[row + 1], f)
        }
    }
}

/// Bilinear interpolation on a regular grid.
///
/// `z` holds one row per `y` value and one column per `x` value, i.e.
/// `z[j][i]` is the value at `(x[i], y[j])`.
pub fn griddata(x: &[f64], y: &[f64], z: &[Vec<f64>], xi: f64, yi: f64) -> f64 {
    let nx = x.len();
    if nx == 0 || y.is_empty() {
        return 0.0;
    }
    let at = |i: usize, j: usize| z[j][i];

    let (i0, fx) = bracket(x, xi);
    let (j0, fy) = bracket(y, yi);
    let i1 = (i0 + 1).min(nx - 1);
    let j1 = (j0 + 1).min(y.len() - 1);

    let bottom = lerp(at(i0, j0), at(i1, j0), fx);
    let top = lerp(at(i0, j1), at(i1, j1), fx);
    lerp(bottom, top, fy)
}

fn bracket(axis: &[f64], value: f64) -> (usize, f64) {
    let row = find_row(axis, value);
    (row, band_fraction(axis, row, value))
}

/// Index of the first axis value that is not monotonically non-decreasing.
pub fn first_non_monotonic(axis: &[f64]) -> Option<usize> {
    axis.windows(2).position(|w| w[1] < w[0]).map(|i| i + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
