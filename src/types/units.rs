//! Unit conversions at the telemetry boundary.

use std::f64::consts::TAU;

pub const MS_TO_KMH: f64 = 3.6;

/// Default track length in meters when the source does not publish one.
pub const DEFAULT_TRACK_LENGTH_M: f64 = 4000.0;

/// Normalize a heading whose unit is not declared by the source.
///
/// Anything larger than one full turn in magnitude is taken to be degrees,
/// so a radian heading beyond 2π is misread.
pub fn normalize_heading(heading: f64) -> f64 {
    if heading.abs() > TAU {
        heading.to_radians()
    } else {
        heading
    }
}

pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * MS_TO_KMH
}
