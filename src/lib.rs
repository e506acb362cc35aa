//! Player-centered radar positions from racing telemetry.
//!
//! A [`telemetry::FieldSource`] publishes named per-car fields each tick,
//! [`radar::Radar`] reads them through a [`telemetry::FieldAccessor`], runs
//! every car through the [`filters::ContinuityEstimator`] and assembles a
//! [`snapshot::Snapshot`]. The server pushes snapshots to websocket consumers.

pub mod broadcast;
pub mod car_class;
pub mod config;
pub mod error;
pub mod filters;
pub mod live_status;
pub mod radar;
pub mod reconnect;
pub mod server;
pub mod snapshot;
pub mod telemetry;
pub mod types;

pub use error::{EstimateError, Result, TelemetryError};
pub use filters::{ContinuityConfig, ContinuityEstimator, EstimatorEvent};
pub use radar::{Radar, TickReport};
pub use snapshot::Snapshot;
