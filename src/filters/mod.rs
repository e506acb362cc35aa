//! Per-car filters that turn raw telemetry into stable radar positions.

pub mod continuity;
pub mod wrap;

pub use continuity::{
    ContinuityConfig, ContinuityEstimator, DiscontinuityCheck, Estimate, EstimateMode,
    EstimateOutput, EstimatorEvent, EstimatorState,
};
pub use wrap::{progress_delta, unwrap_angle, wrap_angle, wrap_progress_delta};
