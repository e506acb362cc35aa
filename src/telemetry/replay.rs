use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use super::source::{FieldSource, FieldValue};
use crate::error::{Result, TelemetryError};

fn default_connected() -> bool {
    true
}

/// One recorded tick of telemetry fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// `false` marks a tick where the simulator was unreachable.
    #[serde(default = "default_connected")]
    pub connected: bool,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplayLog {
    pub frames: Vec<ReplayFrame>,
}

/// Load a `{"frames": [...]}` log, gunzipping `.gz` files.
pub fn load_log(path: &Path) -> Result<ReplayLog> {
    let file = File::open(path).map_err(|source| TelemetryError::ReplayIo {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let log: ReplayLog =
        serde_json::from_reader(reader).map_err(|source| TelemetryError::ReplayParse {
            path: path.to_path_buf(),
            source,
        })?;
    if log.frames.is_empty() {
        return Err(TelemetryError::EmptyReplay(path.to_path_buf()));
    }
    Ok(log)
}

/// Plays a recorded log back one frame per tick.
pub struct ReplaySource {
    path: PathBuf,
    in_memory: bool,
    looping: bool,
    frames: Vec<ReplayFrame>,
    cursor: Option<usize>,
    exhausted: bool,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            in_memory: false,
            looping,
            frames: Vec::new(),
            cursor: None,
            exhausted: false,
        }
    }

    /// Build a source from frames already in memory (offline tools, tests).
    pub fn from_frames(frames: Vec<ReplayFrame>, looping: bool) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            in_memory: true,
            looping,
            frames,
            cursor: None,
            exhausted: false,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// True once a non-looping replay has played its last frame.
    pub fn is_finished(&self) -> bool {
        self.exhausted
    }

    fn current(&self) -> Option<&ReplayFrame> {
        if self.exhausted {
            return None;
        }
        self.frames.get(self.cursor.unwrap_or(0))
    }
}

impl FieldSource for ReplaySource {
    fn describe(&self) -> String {
        format!("replay {}", self.path.display())
    }

    fn connect(&mut self) -> Result<()> {
        if !self.frames.is_empty() && !self.exhausted {
            // Loaded, but the current frame records an outage.
            return if self.is_connected() {
                Ok(())
            } else {
                Err(TelemetryError::SourceUnavailable(format!(
                    "{} is offline at frame {}",
                    self.describe(),
                    self.cursor.unwrap_or(0)
                )))
            };
        }

        if !self.in_memory {
            self.frames = load_log(&self.path)?.frames;
        } else if self.frames.is_empty() {
            return Err(TelemetryError::EmptyReplay(self.path.clone()));
        }
        self.cursor = None;
        self.exhausted = false;
        log::info!("Loaded {} replay frames from {}", self.frames.len(), self.path.display());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.current().map_or(false, |frame| frame.connected)
    }

    fn advance(&mut self) {
        if self.frames.is_empty() || self.exhausted {
            return;
        }
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.frames.len() {
            self.cursor = Some(next);
        } else if self.looping {
            self.cursor = Some(0);
        } else {
            self.exhausted = true;
            log::info!("Replay {} finished", self.path.display());
        }
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.current()
            .filter(|frame| frame.connected)
            .and_then(|frame| frame.fields.get(name))
    }

    fn field_names(&self) -> Vec<String> {
        self.current()
            .map(|frame| frame.fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn shutdown(&mut self) {
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn frame(progress: f64) -> ReplayFrame {
        let mut fields = HashMap::new();
        fields.insert("CarIdxLapDistPct".to_string(), FieldValue::Array(vec![0.0, progress]));
        ReplayFrame { connected: true, fields }
    }

    const LOG_JSON: &str = r#"{"frames": [
        {"fields": {"PlayerCarIdx": 0, "CarIdxLapDistPct": [0.0, 0.5], "CarClass": "Oreca 07"}},
        {"connected": false},
        {"fields": {"CarIdxLapDistPct": [0.0, 0.6]}}
    ]}"#;

    #[test]
    fn test_load_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, LOG_JSON).unwrap();

        let log = load_log(&path).unwrap();
        assert_eq!(log.frames.len(), 3);
        assert!(!log.frames[1].connected);
        assert_eq!(
            log.frames[0].fields.get("CarClass"),
            Some(&FieldValue::Text("Oreca 07".to_string()))
        );
    }

    #[test]
    fn test_load_gzip_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(LOG_JSON.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let log = load_log(&path).unwrap();
        assert_eq!(log.frames.len(), 3);
    }

    #[test]
    fn test_empty_and_missing_logs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"frames": []}"#).unwrap();
        assert!(matches!(load_log(&path), Err(TelemetryError::EmptyReplay(_))));
        assert!(matches!(
            load_log(&dir.path().join("missing.json")),
            Err(TelemetryError::ReplayIo { .. })
        ));
    }

    #[test]
    fn test_replay_steps_through_dropout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, LOG_JSON).unwrap();

        let mut source = ReplaySource::new(&path, false);
        assert!(!source.is_connected());
        source.connect().unwrap();

        source.advance();
        assert!(source.is_connected());
        assert!(source.field("CarClass").is_some());

        source.advance();
        assert!(!source.is_connected());
        assert!(source.field("CarIdxLapDistPct").is_none());
        assert!(source.connect().is_err());

        source.advance();
        assert!(source.is_connected());

        source.advance();
        assert!(source.is_finished());
        assert!(!source.is_connected());
    }

    #[test]
    fn test_looping_replay_restarts() {
        let mut source = ReplaySource::from_frames(vec![frame(0.1), frame(0.2)], true);
        assert_eq!(source.frame_count(), 2);
        source.connect().unwrap();
        for _ in 0..5 {
            source.advance();
            assert!(source.is_connected());
        }
        assert!(!source.is_finished());
    }

    #[test]
    fn test_finished_replay_reloads_on_connect() {
        let mut source = ReplaySource::from_frames(vec![frame(0.1)], false);
        source.connect().unwrap();
        source.advance();
        source.advance();
        assert!(source.is_finished());
        source.connect().unwrap();
        source.advance();
        assert!(source.is_connected());
    }
}
