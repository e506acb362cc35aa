pub mod units;

pub use units::*;

use serde::{Deserialize, Serialize};

/// Car index as published by the telemetry source. Stable for one session.
pub type AgentId = usize;

/// Upper bound on agent indices the source can publish.
pub const MAX_AGENTS: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One agent's raw readings for a single tick.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    /// World-space coordinates; `None` when the source has no usable absolute data.
    pub absolute_position: Option<Position>,
    /// Fraction of the lap completed, wraps 1.0 -> 0.0.
    pub lap_progress: f64,
    /// Heading as published (degrees or radians).
    pub heading: f64,
    /// Speed in m/s.
    pub speed: f64,
    pub track_surface: Option<i32>,
}

impl RawSample {
    pub fn from_progress(lap_progress: f64, heading: f64, speed: f64) -> Self {
        Self {
            absolute_position: None,
            lap_progress,
            heading,
            speed,
            track_surface: None,
        }
    }

    pub fn from_absolute(position: Position, lap_progress: f64, heading: f64, speed: f64) -> Self {
        Self {
            absolute_position: Some(position),
            lap_progress,
            heading,
            speed,
            track_surface: None,
        }
    }
}

/// Per-tick values shared by every agent's estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub player_progress: f64,
    /// Player heading in radians (already normalized).
    pub player_heading: f64,
    /// Meters.
    pub track_length: f64,
}

impl FrameContext {
    pub fn new(player_progress: f64, player_heading: f64, track_length: f64) -> Self {
        Self {
            player_progress,
            player_heading,
            track_length,
        }
    }
}
