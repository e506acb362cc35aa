// radar.rs - turns one tick of telemetry fields into a radar snapshot
//
// Owns the field source, the continuity estimator and the class table.
// Nothing here is async: the broadcast loop drives `tick()` at its own rate,
// and the offline replay tool drives it frame by frame.

use crate::car_class::CarClassTable;
use crate::error::{EstimateError, Result};
use crate::filters::continuity::{ContinuityConfig, ContinuityEstimator, EstimatorEvent};
use crate::snapshot::{CarBlock, Snapshot};
use crate::telemetry::{fields, FieldAccessor, FieldSource};
use crate::types::{
    ms_to_kmh, normalize_heading, AgentId, FrameContext, Position, RawSample, MAX_AGENTS,
};

/// Surface values below this mean the car is not on track this tick.
const OFF_TRACK_SURFACE: i32 = -10;

// ─── Tick output ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub connected: bool,
    pub snapshot: Snapshot,
    /// Agents dropped from this tick because their estimate failed.
    pub omitted: Vec<(AgentId, EstimateError)>,
    pub events: Vec<(AgentId, EstimatorEvent)>,
    /// Agents that had data this tick, before any were omitted.
    pub agents_checked: usize,
}

impl TickReport {
    fn disconnected() -> Self {
        Self {
            connected: false,
            snapshot: Snapshot::empty(),
            ..Self::default()
        }
    }

    pub fn count_events(&self, pred: impl Fn(&EstimatorEvent) -> bool) -> usize {
        self.events.iter().filter(|(_, e)| pred(e)).count()
    }
}

// ─── The assembler ───────────────────────────────────────────────────────────

pub struct Radar {
    source: Box<dyn FieldSource>,
    estimator: ContinuityEstimator,
    classes: CarClassTable,
    fallback_track_length: f64,

    was_connected: bool,
    session_dirty: bool,
    warned_no_absolute: bool,
    warned_no_cars: bool,
    fields_dumped: bool,
}

impl Radar {
    pub fn new(source: Box<dyn FieldSource>, classes: CarClassTable, fallback_track_length: f64) -> Self {
        Self::with_estimator(source, classes, fallback_track_length, ContinuityConfig::default())
    }

    pub fn with_estimator(
        source: Box<dyn FieldSource>,
        classes: CarClassTable,
        fallback_track_length: f64,
        config: ContinuityConfig,
    ) -> Self {
        Self {
            source,
            estimator: ContinuityEstimator::new(config),
            classes,
            fallback_track_length,
            was_connected: false,
            session_dirty: false,
            warned_no_absolute: false,
            warned_no_cars: false,
            fields_dumped: false,
        }
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_connected()
    }

    pub fn estimator(&self) -> &ContinuityEstimator {
        &self.estimator
    }

    pub fn tracked_agents(&self) -> usize {
        self.estimator.len()
    }

    /// Connect the source and start a fresh session on success.
    pub fn connect(&mut self) -> Result<()> {
        self.source.connect()?;
        log::info!("Connected to {}", self.source.describe());
        self.start_session();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.source.shutdown();
        self.was_connected = false;
        self.estimator.reset();
    }

    fn start_session(&mut self) {
        self.estimator.reset();
        self.was_connected = true;
        self.session_dirty = false;
        self.warned_no_absolute = false;
        self.warned_no_cars = false;
        self.fields_dumped = false;
    }

    /// Advance the source one tick and assemble the snapshot.
    pub fn tick(&mut self) -> TickReport {
        self.source.advance();

        if !self.source.is_connected() {
            if self.was_connected {
                log::warn!("Lost connection to {}", self.source.describe());
                self.was_connected = false;
                self.session_dirty = true;
            }
            return TickReport::disconnected();
        }
        if !self.was_connected {
            // Came back without an explicit connect(); agent indices may have moved.
            if self.session_dirty {
                log::info!("{} is back, starting a new session", self.source.describe());
            }
            self.start_session();
        }

        if !self.fields_dumped {
            self.dump_fields();
        }

        let reader = FieldAccessor::new(self.source.as_ref());

        let player_idx: usize = reader.get(fields::PLAYER_CAR_IDX, 0);
        let agent_count = match reader.get::<usize>(fields::CAR_IDX_COUNT, 0) {
            0 => MAX_AGENTS,
            n => n.min(MAX_AGENTS),
        };
        let track_length = match reader.get(fields::TRACK_LENGTH, self.fallback_track_length) {
            t if t.is_finite() && t > 0.0 => t,
            _ => self.fallback_track_length,
        };
        let player_heading = reader
            .element(fields::HEADING, player_idx)
            .unwrap_or_else(|| reader.get(fields::PLAYER_YAW, 0.0));
        let frame = FrameContext::new(
            reader.element_or(fields::LAP_DIST_PCT, player_idx, 0.0),
            normalize_heading(player_heading),
            track_length,
        );

        let model: String = reader.get(fields::CAR_CLASS, String::new());
        let car_class = self.classes.class_of(&model).to_string();

        let absolute_available = reader.array(fields::POS_X).map_or(false, |a| !a.is_empty());
        if !absolute_available && !self.warned_no_absolute {
            log::warn!("Absolute positions unavailable, approximating from lap progress");
            self.warned_no_absolute = true;
        }

        let mut report = TickReport {
            connected: true,
            snapshot: Snapshot::with_player_yaw(frame.player_heading),
            ..TickReport::default()
        };

        for agent in 0..agent_count {
            if agent == player_idx {
                continue;
            }
            let absolute = reader.has_index(fields::POS_X, agent).then(|| {
                Position::new(
                    reader.element_or(fields::POS_X, agent, 0.0),
                    reader.element_or(fields::POS_Y, agent, 0.0),
                    reader.element_or(fields::POS_Z, agent, 0.0),
                )
            });
            let progress = reader.element(fields::LAP_DIST_PCT, agent);
            if absolute.is_none() && progress.is_none() {
                continue;
            }

            let sample = RawSample {
                absolute_position: absolute,
                lap_progress: progress.unwrap_or(0.0),
                heading: reader.element_or(fields::HEADING, agent, 0.0),
                speed: reader.element_or(fields::SPEED, agent, 0.0),
                track_surface: reader
                    .element(fields::TRACK_SURFACE, agent)
                    .filter(|s| s.is_finite())
                    .map(|s| s as i32),
            };
            if sample.track_surface.map_or(false, |s| s < OFF_TRACK_SURFACE) {
                continue;
            }
            report.agents_checked += 1;

            match self.estimator.update(agent, &sample, &frame) {
                Ok(estimate) => {
                    for event in estimate.events {
                        if let EstimatorEvent::DiscontinuityFrozen(check) = &event {
                            log::debug!(
                                "Car {}: discontinuity (jump {:.1} m, progress {:.4}, flip {}, angle {:.2} rad), angle frozen",
                                agent,
                                check.distance_change,
                                check.progress_change,
                                check.sign_flip,
                                check.angle_change
                            );
                        }
                        report.events.push((agent, event));
                    }
                    report.snapshot.cars.push(CarBlock {
                        position: estimate.output.position,
                        car_class: car_class.clone(),
                        speed_kmh: ms_to_kmh(sample.speed),
                        yaw: estimate.output.yaw,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping car this tick: {}", e);
                    report.omitted.push((agent, e));
                }
            }
        }

        if report.snapshot.cars.is_empty() && report.agents_checked > 0 {
            if !self.warned_no_cars {
                log::warn!(
                    "No cars added out of {} checked (count={}, player_idx={})",
                    report.agents_checked,
                    agent_count,
                    player_idx
                );
                self.warned_no_cars = true;
            }
        } else {
            self.warned_no_cars = false;
        }

        report
    }

    fn dump_fields(&mut self) {
        let reader = FieldAccessor::new(self.source.as_ref());
        let relevant: Vec<String> = reader
            .list_available()
            .into_iter()
            .filter(|name| name.contains("CarIdx") || name.contains("Pos") || name.contains("Lap"))
            .collect();
        log::debug!("Available car fields: {:?}", relevant);
        self.fields_dumped = true;
    }
}
