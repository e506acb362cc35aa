//! Telemetry field sources and typed access to their fields.

pub mod accessor;
pub mod replay;
pub mod simulated;
pub mod source;

pub use accessor::{FieldAccessor, FromField};
pub use replay::{load_log, ReplayFrame, ReplayLog, ReplaySource};
pub use simulated::{SimulatedSource, SimulationConfig};
pub use source::{FieldSource, FieldValue};

/// Field names published by the simulator's shared-memory telemetry.
pub mod fields {
    pub const PLAYER_CAR_IDX: &str = "PlayerCarIdx";
    pub const CAR_IDX_COUNT: &str = "CarIdxCount";
    pub const LAP_DIST_PCT: &str = "CarIdxLapDistPct";
    pub const SPEED: &str = "CarIdxSpeed";
    pub const HEADING: &str = "CarIdxHeading";
    pub const PLAYER_YAW: &str = "Yaw";
    pub const TRACK_SURFACE: &str = "CarIdxTrackSurface";
    pub const POS_X: &str = "CarIdxPosX";
    pub const POS_Y: &str = "CarIdxPosY";
    pub const POS_Z: &str = "CarIdxPosZ";
    pub const TRACK_LENGTH: &str = "TrackLength";
    pub const CAR_CLASS: &str = "CarClass";
}
