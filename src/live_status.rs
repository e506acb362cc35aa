use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::radar::TickReport;

/// Server health document served at `/status`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub update_rate_hz: f64,
    // Telemetry source
    pub source: String,
    pub connected: bool,
    pub reconnect_attempts: u64,
    pub reconnect_status: String,
    // Tick loop
    pub ticks: u64,
    pub snapshots_sent: u64,
    pub encode_failures: u64,
    pub last_car_count: usize,
    pub last_omitted: usize,
    pub agents_tracked: usize,
    pub discontinuities_frozen: u64,
    pub consumers: usize,
}

impl LiveStatus {
    pub fn new(source: String, update_rate_hz: f64) -> Self {
        Self {
            timestamp: current_timestamp(),
            started_at: Utc::now(),
            uptime_seconds: 0,
            update_rate_hz,
            source,
            connected: false,
            reconnect_attempts: 0,
            reconnect_status: "waiting".to_string(),
            ticks: 0,
            snapshots_sent: 0,
            encode_failures: 0,
            last_car_count: 0,
            last_omitted: 0,
            agents_tracked: 0,
            discontinuities_frozen: 0,
            consumers: 0,
        }
    }

    pub fn record_tick(&mut self, report: &TickReport, agents_tracked: usize) {
        self.ticks += 1;
        self.connected = report.connected;
        self.last_car_count = report.snapshot.cars.len();
        self.last_omitted = report.omitted.len();
        self.agents_tracked = agents_tracked;
        self.discontinuities_frozen += report.count_events(|e| {
            matches!(e, crate::filters::EstimatorEvent::DiscontinuityFrozen(_))
        }) as u64;
    }

    /// Refresh the time fields before serving.
    pub fn touch(&mut self) {
        self.timestamp = current_timestamp();
        self.uptime_seconds = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
