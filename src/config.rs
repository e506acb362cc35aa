use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::car_class::CarClassTable;
use crate::error::{Result, TelemetryError};
use crate::radar::Radar;
use crate::telemetry::{FieldSource, ReplaySource, SimulatedSource, SimulationConfig};
use crate::types::{DEFAULT_TRACK_LENGTH_M, MAX_AGENTS};

/// Above this the tick period rounds down to nothing.
pub const MAX_UPDATE_RATE_HZ: f64 = 1000.0;
pub const MAX_TRACK_LENGTH_M: f64 = 100_000.0;
pub const MAX_RECONNECT_INTERVAL_S: f64 = 3600.0;

/// Accept `value` only when it is finite, positive and at most `max`.
pub fn check_range(name: &str, value: f64, max: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(TelemetryError::InvalidConfig(format!(
            "{} must be in (0, {}], got {}",
            name, max, value
        )))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Built-in simulated field of cars on a circular track
    Sim,
    /// Recorded frames from --replay-file
    Replay,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "radar_server")]
#[command(about = "Radar telemetry server - streams player-centered car positions over websocket", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8765)]
    pub port: u16,

    /// Snapshots per second
    #[arg(long, default_value_t = 20.0)]
    pub update_rate: f64,

    /// Track length in meters when the source does not report one
    #[arg(long, default_value_t = DEFAULT_TRACK_LENGTH_M)]
    pub track_length: f64,

    /// Seconds between reconnection attempts (grows on repeated failure)
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub reconnect_interval: f64,

    #[arg(long, value_enum, default_value_t = SourceKind::Sim)]
    pub source: SourceKind,

    /// Frame log (.json or .json.gz) for --source replay
    #[arg(long, value_name = "FILE")]
    pub replay_file: Option<PathBuf>,

    /// Restart the replay when it reaches the end
    #[arg(long)]
    pub loop_replay: bool,

    /// Cars in the simulated field, player included
    #[arg(long, default_value_t = 12)]
    pub sim_cars: usize,

    /// Withhold absolute positions from the simulation (lap progress only)
    #[arg(long)]
    pub sim_no_absolute: bool,

    /// JSON object of car model -> class, merged over the built-in table
    #[arg(long, value_name = "FILE")]
    pub class_table: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            update_rate: 20.0,
            track_length: DEFAULT_TRACK_LENGTH_M,
            reconnect_interval: 5.0,
            source: SourceKind::Sim,
            replay_file: None,
            loop_replay: false,
            sim_cars: 12,
            sim_no_absolute: false,
            class_table: None,
            verbose: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("--update-rate", self.update_rate, MAX_UPDATE_RATE_HZ)?;
        check_range("--track-length", self.track_length, MAX_TRACK_LENGTH_M)?;
        check_range("--reconnect-interval", self.reconnect_interval, MAX_RECONNECT_INTERVAL_S)?;

        if self.source == SourceKind::Replay && self.replay_file.is_none() {
            return Err(TelemetryError::InvalidConfig(
                "--source replay requires --replay-file".to_string(),
            ));
        }
        if !(1..MAX_AGENTS).contains(&self.sim_cars) {
            return Err(TelemetryError::InvalidConfig(format!(
                "--sim-cars must be between 1 and {}, got {}",
                MAX_AGENTS - 1,
                self.sim_cars
            )));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_interval)
    }

    pub fn build_source(&self) -> Result<Box<dyn FieldSource>> {
        match self.source {
            SourceKind::Sim => Ok(Box::new(SimulatedSource::new(SimulationConfig {
                cars: self.sim_cars,
                track_length: self.track_length,
                dt: 1.0 / self.update_rate,
                absolute_positions: !self.sim_no_absolute,
                ..SimulationConfig::default()
            }))),
            SourceKind::Replay => {
                let path = self.replay_file.clone().ok_or_else(|| {
                    TelemetryError::InvalidConfig("--source replay requires --replay-file".to_string())
                })?;
                Ok(Box::new(ReplaySource::new(path, self.loop_replay)))
            }
        }
    }

    pub fn build_class_table(&self) -> Result<CarClassTable> {
        match &self.class_table {
            Some(path) => CarClassTable::with_overrides(path),
            None => Ok(CarClassTable::default()),
        }
    }

    /// Validated radar for this configuration, not yet connected.
    pub fn build_radar(&self) -> Result<Radar> {
        self.validate()?;
        Ok(Radar::new(
            self.build_source()?,
            self.build_class_table()?,
            self.track_length,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        ServerConfig::try_parse_from(std::iter::once("radar_server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8765);
        assert_eq!(config.update_rate, 20.0);
        assert_eq!(config.track_length, 4000.0);
        assert_eq!(config.reconnect_interval, 5.0);
        assert_eq!(config.source, SourceKind::Sim);
        assert_eq!(config.sim_cars, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replay_flags() {
        let config = parse(&["--source", "replay", "--replay-file", "s.json.gz", "--loop-replay", "-v"]);
        assert_eq!(config.source, SourceKind::Replay);
        assert!(config.loop_replay);
        assert!(config.verbose);
        assert!(config.validate().is_ok());
        assert!(config.build_source().unwrap().describe().contains("s.json.gz"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            ServerConfig { update_rate: 0.0, ..ServerConfig::default() },
            ServerConfig { update_rate: f64::NAN, ..ServerConfig::default() },
            ServerConfig { track_length: -1.0, ..ServerConfig::default() },
            ServerConfig { reconnect_interval: 0.0, ..ServerConfig::default() },
            ServerConfig { source: SourceKind::Replay, ..ServerConfig::default() },
            ServerConfig { sim_cars: 0, ..ServerConfig::default() },
            ServerConfig { sim_cars: 64, ..ServerConfig::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(TelemetryError::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
        assert!(ServerConfig { sim_cars: 63, ..ServerConfig::default() }.validate().is_ok());
    }

    #[test]
    fn test_validation_upper_bounds() {
        let too_large = [
            ServerConfig { update_rate: 1e10, ..ServerConfig::default() },
            ServerConfig { update_rate: f64::INFINITY, ..ServerConfig::default() },
            ServerConfig { reconnect_interval: 1e20, ..ServerConfig::default() },
            ServerConfig { track_length: 1e9, ..ServerConfig::default() },
        ];
        for config in too_large {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
            assert!(config.build_radar().is_err());
        }

        let at_limit = ServerConfig {
            update_rate: MAX_UPDATE_RATE_HZ,
            track_length: MAX_TRACK_LENGTH_M,
            reconnect_interval: MAX_RECONNECT_INTERVAL_S,
            ..ServerConfig::default()
        };
        assert!(at_limit.validate().is_ok());
        assert!(at_limit.reconnect_delay() > Duration::ZERO);
        assert!(Duration::from_secs_f64(1.0 / at_limit.update_rate) > Duration::ZERO);
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("--track-length", 4000.0, MAX_TRACK_LENGTH_M).is_ok());
        assert!(check_range("--track-length", 0.0, MAX_TRACK_LENGTH_M).is_err());
        assert!(check_range("--track-length", f64::NAN, MAX_TRACK_LENGTH_M).is_err());
        let err = check_range("--track-length", 1e9, MAX_TRACK_LENGTH_M).unwrap_err();
        assert!(err.to_string().contains("--track-length"));
    }

    #[test]
    fn test_build_radar_from_sim() {
        let config = parse(&["--sim-cars", "5", "--sim-no-absolute"]);
        let mut radar = config.build_radar().unwrap();
        radar.connect().unwrap();
        let report = radar.tick();
        assert_eq!(report.snapshot.cars.len(), 4);
    }
}
