//! Time calculation utilities for damped motion
//!
//! Pure functions: no clocks are read here, elapsed time is always passed in.

/// Frame duration the lerp factor is expressed against (seconds)
pub const REFERENCE_FRAME_SECS: f64 = 1.0 / 60.0;

/// Continuous decay rate (per second) equivalent to closing `lerp` of the
/// remaining distance every reference frame
///
/// `k = -ln(1 - lerp) / (1/60)`
#[inline]
pub fn decay_rate(lerp: f64) -> f64 {
    -(1.0 - lerp).ln() / REFERENCE_FRAME_SECS
}

/// Share of the remaining distance closed after `dt_ms` at decay rate `k`
///
/// Negative or non-finite elapsed time closes nothing.
#[inline]
pub fn decay_alpha(rate: f64, dt_ms: f64) -> f64 {
    if !dt_ms.is_finite() || dt_ms <= 0.0 {
        return 0.0;
    }
    1.0 - (-rate * dt_ms / 1000.0).exp()
}

/// Linear interpolation between two values
///
/// # Arguments
/// * `from` - Start value
/// * `to` - End value
/// * `t` - Interpolation factor [0.0, 1.0]
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Units per millisecond, zero when no time elapsed
#[inline]
pub fn velocity(delta: f64, dt_ms: f64) -> f64 {
    if dt_ms > 0.0 {
        delta / dt_ms
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert!((lerp(0.0, 100.0, 0.0) - 0.0).abs() < 0.001);
        assert!((lerp(0.0, 100.0, 0.5) - 50.0).abs() < 0.001);
        assert!((lerp(0.0, 100.0, 1.0) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_one_reference_frame_closes_lerp() {
        let rate = decay_rate(0.1);
        let alpha = decay_alpha(rate, 1000.0 / 60.0);
        assert!((alpha - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_composes_across_frames() {
        // Two 8ms frames close the same distance as one 16ms frame.
        let rate = decay_rate(0.25);
        let one = decay_alpha(rate, 16.0);
        let half = decay_alpha(rate, 8.0);
        let two = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((one - two).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_without_elapsed_time() {
        let rate = decay_rate(0.1);
        assert_eq!(decay_alpha(rate, 0.0), 0.0);
        assert_eq!(decay_alpha(rate, -5.0), 0.0);
        assert_eq!(decay_alpha(rate, f64::NAN), 0.0);
    }

    #[test]
    fn test_velocity() {
        assert_eq!(velocity(32.0, 16.0), 2.0);
        assert_eq!(velocity(32.0, 0.0), 0.0);
    }
}
