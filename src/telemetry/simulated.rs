use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use super::fields;
use super::source::{FieldSource, FieldValue};
use crate::error::Result;

const BASE_SPEED_MS: f64 = 50.0;
const SPEED_STEP_MS: f64 = 0.7;
const ON_TRACK_SURFACE: f64 = 3.0;

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub cars: usize,
    pub track_length: f64,
    /// Seconds advanced per tick.
    pub dt: f64,
    /// Publish `CarIdxPosX/Y/Z`. When off, consumers must rebuild positions from lap progress.
    pub absolute_positions: bool,
    pub car_class: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cars: 12,
            track_length: 4000.0,
            dt: 0.05,
            absolute_positions: true,
            car_class: "Porsche 963".to_string(),
        }
    }
}

/// Cars lapping a circular track centered on the world origin.
///
/// Car 0 is the player. Every car runs at its own constant speed so the
/// field spreads out and cars cross the start/finish line at different ticks.
/// Headings are published in degrees.
pub struct SimulatedSource {
    config: SimulationConfig,
    connected: bool,
    elapsed: f64,
    start_progress: Vec<f64>,
    fields: HashMap<String, FieldValue>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Self {
        let cars = config.cars.max(1);
        let start_progress = (0..cars).map(|i| i as f64 / cars as f64).collect();
        Self {
            config,
            connected: false,
            elapsed: 0.0,
            start_progress,
            fields: HashMap::new(),
        }
    }

    fn radius(&self) -> f64 {
        self.config.track_length / TAU
    }

    fn car_speed(index: usize) -> f64 {
        BASE_SPEED_MS + index as f64 * SPEED_STEP_MS
    }

    fn progress_at(&self, index: usize, elapsed: f64) -> f64 {
        let travelled = Self::car_speed(index) * elapsed / self.config.track_length;
        (self.start_progress[index] + travelled).rem_euclid(1.0)
    }

    fn publish(&mut self) {
        let cars = self.start_progress.len();
        let radius = self.radius();

        let mut progress = Vec::with_capacity(cars);
        let mut speed = Vec::with_capacity(cars);
        let mut heading = Vec::with_capacity(cars);
        let mut pos_x = Vec::with_capacity(cars);
        let mut pos_y = Vec::with_capacity(cars);

        for i in 0..cars {
            let p = self.progress_at(i, self.elapsed);
            let phi = p * TAU;
            progress.push(p);
            speed.push(Self::car_speed(i));
            // Counter-clockwise travel: tangent is 90° ahead of the radius.
            heading.push((phi + PI / 2.0).to_degrees().rem_euclid(360.0));
            pos_x.push(radius * phi.cos());
            pos_y.push(radius * phi.sin());
        }

        self.fields.clear();
        self.fields.insert(fields::PLAYER_CAR_IDX.into(), FieldValue::Number(0.0));
        self.fields.insert(fields::CAR_IDX_COUNT.into(), FieldValue::Number(cars as f64));
        self.fields.insert(fields::TRACK_LENGTH.into(), FieldValue::Number(self.config.track_length));
        self.fields.insert(fields::CAR_CLASS.into(), FieldValue::Text(self.config.car_class.clone()));
        self.fields.insert(fields::LAP_DIST_PCT.into(), FieldValue::Array(progress));
        self.fields.insert(fields::SPEED.into(), FieldValue::Array(speed));
        self.fields.insert(fields::HEADING.into(), FieldValue::Array(heading));
        self.fields.insert(
            fields::TRACK_SURFACE.into(),
            FieldValue::Array(vec![ON_TRACK_SURFACE; cars]),
        );
        if self.config.absolute_positions {
            self.fields.insert(fields::POS_X.into(), FieldValue::Array(pos_x));
            self.fields.insert(fields::POS_Y.into(), FieldValue::Array(pos_y));
            self.fields.insert(fields::POS_Z.into(), FieldValue::Array(vec![0.0; cars]));
        }
    }
}

impl FieldSource for SimulatedSource {
    fn describe(&self) -> String {
        format!(
            "simulation ({} cars, {:.0} m, absolute={})",
            self.start_progress.len(),
            self.config.track_length,
            self.config.absolute_positions
        )
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        self.publish();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn advance(&mut self) {
        if !self.connected {
            return;
        }
        self.elapsed += self.config.dt;
        self.publish();
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        if !self.connected {
            return None;
        }
        self.fields.get(name)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn shutdown(&mut self) {
        self.connected = false;
        self.fields.clear();
    }
}
