// continuity.rs - per-car relative position filter for the radar
//
// Each tick a car arrives either with world coordinates (absolute mode) or
// with lap progress only (progress mode). Absolute coordinates jump when the
// simulator wraps a car around the lap seam; progress is smooth but carries
// no lateral information. The filter keeps the previous accepted estimate
// per car and reconciles the two so the radar never sees a teleport.
//
// `estimate` is a pure function of (prior state, sample, frame) and never
// touches the stored state. `update` commits on success only, so a failed
// car keeps its last good state and retries next tick.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_3, PI};

use nalgebra::Vector2;
use serde::Serialize;

use super::wrap::{progress_delta, unwrap_angle, wrap_angle, wrap_progress_delta};
use crate::error::EstimateError;
use crate::types::{normalize_heading, AgentId, FrameContext, Position, RawSample};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Thresholds of the discontinuity and smoothing heuristics.
///
/// The defaults are tuned against live sessions; tests pin them.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuityConfig {
    /// Jump (m) that counts as a discontinuity when lap progress stalls.
    pub discontinuity_jump_m: f64,
    /// Jump (m) that counts as a discontinuity when an axis flips sign.
    pub sign_flip_jump_m: f64,
    /// Both components must exceed this (m) for a sign flip to count.
    pub sign_flip_min_component: f64,
    /// Bearing change (rad) that, with a large jump, counts as a discontinuity.
    pub angle_jump_rad: f64,
    /// Lap-progress step below which the car is considered not to have moved.
    pub progress_stall: f64,
    /// Distance-along-track step (m) above which progress mode smooths.
    pub progress_smoothing_threshold_m: f64,
    /// Weight of the new value when smoothing; the prior gets the rest.
    pub progress_smoothing_weight: f64,
    /// Raw progress step that means the car crossed the start/finish line.
    pub lap_wrap_threshold: f64,
    /// Below this distance (m) the bearing is undefined and reported as 0.
    pub min_distance_for_angle: f64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            discontinuity_jump_m: 10.0,
            sign_flip_jump_m: 5.0,
            sign_flip_min_component: 0.1,
            angle_jump_rad: FRAC_PI_3,
            progress_stall: 0.02,
            progress_smoothing_threshold_m: 5.0,
            progress_smoothing_weight: 0.3,
            lap_wrap_threshold: 0.8,
            min_distance_for_angle: 1e-3,
        }
    }
}

// ─── State and output ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EstimateMode {
    Absolute,
    Progress,
}

/// Last accepted estimate for one car.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorState {
    /// Unwrapped bearing (rad), continuous across turns.
    pub relative_angle: f64,
    /// Player-centered (x, y) in meters.
    pub position: (f64, f64),
    /// Signed distance along the track to the player (m).
    pub distance_along_track: f64,
    /// Raw lap fraction of the car.
    pub lap_progress: f64,
    /// Magnitude of the accepted relative vector (m).
    pub distance_abs: f64,
    pub mode: EstimateMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimateOutput {
    pub position: Position,
    /// The car's own heading in radians.
    pub yaw: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EstimatorEvent {
    FirstObservation { mode: EstimateMode },
    ModeSwitched { from: EstimateMode, to: EstimateMode },
    DiscontinuityFrozen(DiscontinuityCheck),
    ProgressSmoothed { raw: f64, smoothed: f64 },
    LapBoundaryCrossed { from: f64, to: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    pub agent: AgentId,
    pub mode: EstimateMode,
    pub output: EstimateOutput,
    pub next_state: EstimatorState,
    /// Wrapped lap-progress step since the prior tick, if there was one.
    pub progress_step: Option<f64>,
    pub events: Vec<EstimatorEvent>,
}

impl Estimate {
    pub fn is_frozen(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, EstimatorEvent::DiscontinuityFrozen(_)))
    }
}

// ─── Discontinuity detection ─────────────────────────────────────────────────

/// Signals compared against the prior accepted estimate in absolute mode.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscontinuityCheck {
    /// Displacement (m) between the candidate and prior relative positions.
    pub distance_change: f64,
    /// Magnitude of the wrapped lap-progress step.
    pub progress_change: f64,
    pub sign_flip: bool,
    /// Shortest signed bearing change (rad).
    pub angle_change: f64,
}

impl DiscontinuityCheck {
    pub fn measure(
        prior: &EstimatorState,
        candidate: Vector2<f64>,
        candidate_angle: f64,
        lap_progress: f64,
        config: &ContinuityConfig,
    ) -> Self {
        let previous = Vector2::new(prior.position.0, prior.position.1);
        let min = config.sign_flip_min_component;
        let flipped = |a: f64, b: f64| a.abs() > min && b.abs() > min && a.signum() != b.signum();

        Self {
            distance_change: (candidate - previous).norm(),
            progress_change: wrap_progress_delta(lap_progress - prior.lap_progress).abs(),
            sign_flip: flipped(previous.x, candidate.x) || flipped(previous.y, candidate.y),
            angle_change: wrap_angle(candidate_angle - prior.relative_angle),
        }
    }

    pub fn is_discontinuity(&self, config: &ContinuityConfig) -> bool {
        let stalled_jump = self.distance_change > config.discontinuity_jump_m
            && self.progress_change < config.progress_stall;
        let flipped_jump = self.sign_flip && self.distance_change > config.sign_flip_jump_m;
        let swung_jump = self.angle_change.abs() > config.angle_jump_rad
            && self.distance_change > config.discontinuity_jump_m;
        stalled_jump || flipped_jump || swung_jump
    }
}

// ─── The estimator ───────────────────────────────────────────────────────────

/// Owns one [`EstimatorState`] per car for the current session.
#[derive(Default)]
pub struct ContinuityEstimator {
    config: ContinuityConfig,
    states: HashMap<AgentId, EstimatorState>,
}

/// Candidate values of one tick before they become state.
struct Accepted {
    angle: f64,
    position: (f64, f64),
    distance_abs: f64,
    distance_along_track: f64,
    z: f64,
}

impl ContinuityEstimator {
    pub fn new(config: ContinuityConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, agent: AgentId) -> Option<&EstimatorState> {
        self.states.get(&agent)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop every car's history. Called on a session boundary.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Estimate and, on success, store the new state for `agent`.
    pub fn update(
        &mut self,
        agent: AgentId,
        sample: &RawSample,
        frame: &FrameContext,
    ) -> Result<Estimate, EstimateError> {
        let estimate = self.estimate(agent, sample, frame)?;
        self.states.insert(agent, estimate.next_state.clone());
        Ok(estimate)
    }

    /// Compute this tick's estimate without modifying stored state.
    pub fn estimate(
        &self,
        agent: AgentId,
        sample: &RawSample,
        frame: &FrameContext,
    ) -> Result<Estimate, EstimateError> {
        let finite = |field: &'static str, value: f64| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(EstimateError::NonFiniteInput { agent, field, value })
            }
        };
        finite("lap_progress", sample.lap_progress)?;
        finite("heading", sample.heading)?;
        finite("player_progress", frame.player_progress)?;
        finite("track_length", frame.track_length)?;

        let prior = self.states.get(&agent);
        let mut events = Vec::new();

        let progress_step = prior.map(|p| {
            let raw_step = sample.lap_progress - p.lap_progress;
            if raw_step.abs() > self.config.lap_wrap_threshold {
                events.push(EstimatorEvent::LapBoundaryCrossed {
                    from: p.lap_progress,
                    to: sample.lap_progress,
                });
            }
            wrap_progress_delta(raw_step)
        });

        let track_distance = progress_delta(sample.lap_progress, frame.player_progress) * frame.track_length;

        let absolute = sample.absolute_position.filter(Position::is_finite);
        let mode = if absolute.is_some() {
            EstimateMode::Absolute
        } else {
            EstimateMode::Progress
        };
        if let Some(p) = prior {
            if p.mode != mode {
                events.push(EstimatorEvent::ModeSwitched { from: p.mode, to: mode });
            }
        }

        let accepted = match absolute {
            Some(position) => {
                self.resolve_absolute(agent, prior, position, sample, track_distance, &mut events)?
            }
            None => self.resolve_progress(agent, prior, track_distance, frame, &mut events)?,
        };

        let next_state = EstimatorState {
            relative_angle: accepted.angle,
            position: accepted.position,
            distance_along_track: accepted.distance_along_track,
            lap_progress: sample.lap_progress,
            distance_abs: accepted.distance_abs,
            mode,
        };
        let output = EstimateOutput {
            position: Position::new(accepted.position.0, accepted.position.1, accepted.z),
            yaw: normalize_heading(sample.heading),
        };

        let all_finite = next_state.relative_angle.is_finite()
            && next_state.distance_along_track.is_finite()
            && next_state.distance_abs.is_finite()
            && output.position.is_finite();
        if !all_finite {
            return Err(EstimateError::NonFiniteCandidate {
                agent,
                quantity: "estimate",
            });
        }

        Ok(Estimate {
            agent,
            mode,
            output,
            next_state,
            progress_step,
            events,
        })
    }

    fn resolve_absolute(
        &self,
        agent: AgentId,
        prior: Option<&EstimatorState>,
        position: Position,
        sample: &RawSample,
        track_distance: f64,
        events: &mut Vec<EstimatorEvent>,
    ) -> Result<Accepted, EstimateError> {
        // The player is the origin of the radar frame, so world coordinates
        // are used as the relative vector directly.
        let relative = Vector2::new(position.x, position.y);
        let distance = relative.norm();
        let candidate_angle = if distance < self.config.min_distance_for_angle {
            0.0
        } else {
            relative.y.atan2(relative.x)
        };
        if !distance.is_finite() || !candidate_angle.is_finite() {
            return Err(EstimateError::NonFiniteCandidate {
                agent,
                quantity: "relative vector",
            });
        }

        let prior = match prior.filter(|p| p.mode == EstimateMode::Absolute) {
            Some(p) => p,
            None => {
                events.push(EstimatorEvent::FirstObservation {
                    mode: EstimateMode::Absolute,
                });
                return Ok(Accepted {
                    angle: candidate_angle,
                    position: (relative.x, relative.y),
                    distance_abs: distance,
                    distance_along_track: track_distance,
                    z: position.z,
                });
            }
        };

        let check = DiscontinuityCheck::measure(
            prior,
            relative,
            candidate_angle,
            sample.lap_progress,
            &self.config,
        );

        if check.is_discontinuity(&self.config) {
            // Hold the bearing and place the car by track distance until
            // the world coordinates settle again.
            let angle = prior.relative_angle;
            let d = track_distance.abs();
            events.push(EstimatorEvent::DiscontinuityFrozen(check));
            Ok(Accepted {
                angle,
                position: (d * angle.cos(), d * angle.sin()),
                distance_abs: d,
                distance_along_track: track_distance,
                z: position.z,
            })
        } else {
            Ok(Accepted {
                angle: unwrap_angle(candidate_angle, prior.relative_angle),
                position: (relative.x, relative.y),
                distance_abs: distance,
                distance_along_track: track_distance,
                z: position.z,
            })
        }
    }

    /// Places the car at |d| along the carried angle. The ahead/behind side
    /// is fixed by the first sighting: a car first seen behind stays at
    /// heading + π until its state is reset, even after it overtakes.
    fn resolve_progress(
        &self,
        agent: AgentId,
        prior: Option<&EstimatorState>,
        track_distance: f64,
        frame: &FrameContext,
        events: &mut Vec<EstimatorEvent>,
    ) -> Result<Accepted, EstimateError> {
        let (angle, distance, distance_abs) = match prior {
            None => {
                if !frame.player_heading.is_finite() {
                    return Err(EstimateError::NonFiniteInput {
                        agent,
                        field: "player_heading",
                        value: frame.player_heading,
                    });
                }
                events.push(EstimatorEvent::FirstObservation {
                    mode: EstimateMode::Progress,
                });
                let behind = if track_distance < 0.0 { PI } else { 0.0 };
                (frame.player_heading + behind, track_distance, 0.0)
            }
            Some(p) => {
                let step = track_distance - p.distance_along_track;
                let distance = if step.abs() > self.config.progress_smoothing_threshold_m {
                    let w = self.config.progress_smoothing_weight;
                    let smoothed = (1.0 - w) * p.distance_along_track + w * track_distance;
                    events.push(EstimatorEvent::ProgressSmoothed {
                        raw: track_distance,
                        smoothed,
                    });
                    smoothed
                } else {
                    track_distance
                };
                (p.relative_angle, distance, p.distance_abs)
            }
        };

        let d = distance.abs();
        Ok(Accepted {
            angle,
            position: (d * angle.cos(), d * angle.sin()),
            distance_abs,
            distance_along_track: distance,
            z: 0.0,
        })
    }
}
