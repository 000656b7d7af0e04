//! Min-max stretch of raw pixel samples into the 8-bit range.

/// Stretch `values` so the minimum maps to 0 and the maximum to 255.
///
/// The minimum is subtracted first and negative results are floored at zero.
/// When the shifted maximum is not positive (a constant array) every output
/// is zero. Non-finite samples map to zero.
pub fn normalize_to_u8(values: &[f32]) -> Vec<u8> {
    let min = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f32::INFINITY, f32::min);
    if !min.is_finite() {
        return vec![0; values.len()];
    }

    let shifted: Vec<f32> = values.iter().map(|&v| (v - min).max(0.0)).collect();
    let max = shifted
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f32, f32::max);

    if max > 0.0 {
        shifted
            .iter()
            .map(|&v| to_u8(f64::from(v) / f64::from(max) * 255.0))
            .collect()
    } else {
        vec![0; values.len()]
    }
}

fn to_u8(v: f64) -> u8 {
    if v.is_finite() {
        v.round().clamp(0.0, 255.0) as u8
    } else {
        0
    }
}
