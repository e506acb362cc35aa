use std::f64::consts::{PI, TAU};

/// Largest magnitude a wrapped lap-progress delta can take.
pub const MAX_PROGRESS_DELTA: f64 = 0.5;

/// Shortest signed distance around the lap, as a fraction in [-0.5, 0.5].
///
/// `delta` is a difference of two lap fractions, so for inputs in [0, 1) a
/// single ±1.0 correction is enough. The remainder keeps wider inputs in range.
pub fn wrap_progress_delta(delta: f64) -> f64 {
    let mut d = delta % 1.0;
    if d > MAX_PROGRESS_DELTA {
        d -= 1.0;
    } else if d < -MAX_PROGRESS_DELTA {
        d += 1.0;
    }
    d
}

/// Signed lap fraction from `reference` to `progress`.
pub fn progress_delta(progress: f64, reference: f64) -> f64 {
    wrap_progress_delta(progress - reference)
}

/// Wrap an angle into [-π, π).
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Shift `candidate` by whole turns so it lies within π of `prior`.
pub fn unwrap_angle(candidate: f64, prior: f64) -> f64 {
    prior + wrap_angle(candidate - prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_progress_delta_wraps_forward() {
        // Agent just crossed the line ahead of a player still finishing the lap.
        assert_relative_eq!(progress_delta(0.02, 0.98), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_progress_delta_wraps_backward() {
        assert_relative_eq!(progress_delta(0.98, 0.02), -0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_progress_delta_in_range_for_grid() {
        for i in 0..100 {
            for j in 0..100 {
                let a = i as f64 / 100.0;
                let b = j as f64 / 100.0;
                let d = progress_delta(a, b);
                assert!((-0.5..=0.5).contains(&d), "delta {} for {} - {}", d, a, b);
            }
        }
    }

    #[test]
    fn test_progress_delta_half_lap_kept() {
        assert_eq!(wrap_progress_delta(0.5), 0.5);
        assert_eq!(wrap_progress_delta(-0.5), -0.5);
    }

    #[test]
    fn test_wrap_angle_range() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.25), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_unwrap_stays_within_half_turn() {
        let prior = 7.0 * PI;
        for k in -20..20 {
            let candidate = k as f64 * 0.37;
            let accepted = unwrap_angle(candidate, prior);
            assert!((accepted - prior).abs() <= PI + 1e-9);
            let turns = (accepted - candidate) / TAU;
            assert_relative_eq!(turns, turns.round(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unwrap_across_pi_boundary() {
        // Just below +π followed by just above -π is a small clockwise step.
        let accepted = unwrap_angle(-PI + 0.01, PI - 0.01);
        assert_relative_eq!(accepted, PI + 0.01, epsilon = 1e-12);
    }
}
