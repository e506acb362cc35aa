//! Wire types pushed to radar consumers.

use serde::{Deserialize, Serialize};

use crate::types::Position;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerBlock {
    pub position: Position,
    pub yaw: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarBlock {
    pub position: Position,
    #[serde(rename = "class")]
    pub car_class: String,
    /// km/h
    #[serde(rename = "speed")]
    pub speed_kmh: f64,
    pub yaw: f64,
}

/// One tick of radar data. The player always sits at the origin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub player: PlayerBlock,
    pub cars: Vec<CarBlock>,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn sanitize_position(p: Position) -> Position {
    Position::new(finite_or_zero(p.x), finite_or_zero(p.y), finite_or_zero(p.z))
}

impl Snapshot {
    /// Player at the origin, no cars. Sent while the source is disconnected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_player_yaw(yaw: f64) -> Self {
        Self {
            player: PlayerBlock {
                position: Position::ORIGIN,
                yaw,
            },
            cars: Vec::new(),
        }
    }

    /// Copy with every non-finite float replaced by 0.0.
    pub fn sanitized(&self) -> Self {
        Self {
            player: PlayerBlock {
                position: sanitize_position(self.player.position),
                yaw: finite_or_zero(self.player.yaw),
            },
            cars: self
                .cars
                .iter()
                .map(|car| CarBlock {
                    position: sanitize_position(car.position),
                    car_class: car.car_class.clone(),
                    speed_kmh: finite_or_zero(car.speed_kmh),
                    yaw: finite_or_zero(car.yaw),
                })
                .collect(),
        }
    }

    /// Sanitize and encode as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn car(x: f64, speed: f64) -> CarBlock {
        CarBlock {
            position: Position::new(x, 2.0, 0.0),
            car_class: "LMP2".to_string(),
            speed_kmh: speed,
            yaw: 0.5,
        }
    }

    #[test]
    fn test_json_shape() {
        let snapshot = Snapshot {
            player: PlayerBlock {
                position: Position::ORIGIN,
                yaw: 1.25,
            },
            cars: vec![car(10.0, 180.0)],
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "player": {"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "yaw": 1.25},
                "cars": [{
                    "position": {"x": 10.0, "y": 2.0, "z": 0.0},
                    "class": "LMP2",
                    "speed": 180.0,
                    "yaw": 0.5
                }]
            })
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let value: serde_json::Value =
            serde_json::from_str(&Snapshot::empty().to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"player": {"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "yaw": 0.0}, "cars": []})
        );
    }

    #[test]
    fn test_non_finite_values_zeroed() {
        let snapshot = Snapshot {
            player: PlayerBlock {
                position: Position::ORIGIN,
                yaw: f64::NAN,
            },
            cars: vec![car(f64::INFINITY, f64::NEG_INFINITY), car(3.0, 100.0)],
        };
        let clean = snapshot.sanitized();
        assert_eq!(clean.player.yaw, 0.0);
        assert_eq!(clean.cars[0].position.x, 0.0);
        assert_eq!(clean.cars[0].speed_kmh, 0.0);
        assert_eq!(clean.cars[1], car(3.0, 100.0));

        // serde_json writes NaN as null; sanitized output never does.
        let text = snapshot.to_json().unwrap();
        assert!(!text.contains("null"));
    }
}
