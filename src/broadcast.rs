// broadcast.rs - tick driver and source reconnection
//
// Two background tasks share the radar:
//   - the tick loop computes one snapshot per period and publishes the
//     encoded JSON on a broadcast channel, one copy for every consumer
//   - the reconnect loop polls a disconnected source at a lower rate
//
// Both take the radar lock for a whole tick or a whole connect attempt, so
// a reconnect never lands in the middle of a tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::live_status::LiveStatus;
use crate::radar::{Radar, TickReport};
use crate::reconnect::ReconnectState;

/// Encoded snapshots buffered per consumer before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub radar: Arc<Mutex<Radar>>,
    pub snapshots: broadcast::Sender<String>,
    pub status: Arc<RwLock<LiveStatus>>,
}

impl AppState {
    pub fn new(radar: Radar, update_rate_hz: f64) -> Self {
        let status = LiveStatus::new(radar.describe(), update_rate_hz);
        let (snapshots, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            radar: Arc::new(Mutex::new(radar)),
            snapshots,
            status: Arc::new(RwLock::new(status)),
        }
    }

    pub fn consumers(&self) -> usize {
        self.snapshots.receiver_count()
    }
}

/// Compute one snapshot and hand it to every subscribed consumer.
///
/// The estimator runs even with nobody listening so a consumer that joins
/// later sees continuous positions.
pub async fn publish_tick(state: &AppState) -> TickReport {
    let (report, tracked) = {
        let mut radar = state.radar.lock().await;
        let report = radar.tick();
        (report, radar.tracked_agents())
    };

    let mut sent = false;
    let mut encode_failed = false;
    if state.consumers() > 0 {
        match report.snapshot.to_json() {
            // A send error only means every consumer left since the check.
            Ok(json) => sent = state.snapshots.send(json).is_ok(),
            Err(e) => {
                log::warn!("Failed to encode snapshot, skipping tick: {}", e);
                encode_failed = true;
            }
        }
    }

    let mut status = state.status.write().await;
    status.record_tick(&report, tracked);
    status.consumers = state.consumers();
    if sent {
        status.snapshots_sent += 1;
    }
    if encode_failed {
        status.encode_failures += 1;
    }

    report
}

pub async fn run_tick_loop(state: AppState, update_rate_hz: f64) {
    let period = Duration::from_secs_f64(1.0 / update_rate_hz);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log::info!("Broadcasting at {:.1} Hz", update_rate_hz);

    loop {
        ticker.tick().await;
        publish_tick(&state).await;
    }
}

/// Try to connect if the source is down. Returns true on a new connection.
pub async fn attempt_reconnect(state: &AppState, backoff: &mut ReconnectState) -> bool {
    let (description, result) = {
        let mut radar = state.radar.lock().await;
        if radar.is_connected() {
            return false;
        }
        (radar.describe(), radar.connect())
    };

    let connected = match result {
        Ok(()) => {
            backoff.record_success(&description);
            true
        }
        Err(e) => {
            backoff.record_failure(&description, &e);
            false
        }
    };

    let mut status = state.status.write().await;
    status.connected = connected;
    status.reconnect_attempts = backoff.total_attempts;
    status.reconnect_status = backoff.status();
    connected
}

pub async fn run_reconnect_loop(state: AppState, base_interval: Duration) {
    let mut backoff = ReconnectState::new(base_interval);
    loop {
        attempt_reconnect(&state, &mut backoff).await;
        sleep(backoff.delay()).await;
    }
}
