//! Car model → racing class lookup.
//!
//! The simulator reports the player's car model name only, so every car on
//! the radar is tagged with the class of the player's model.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TelemetryError};

pub const UNKNOWN_CLASS: &str = "Unknown";

const DEFAULT_CLASSES: &[(&str, &str)] = &[
    // LMDh
    ("HPD ARX-01c", "LMDh"),
    ("HPD ARX-01g", "LMDh"),
    ("Acura ARX-06", "LMDh"),
    ("BMW M Hybrid V8", "LMDh"),
    ("Cadillac V-Series.R", "LMDh"),
    ("Porsche 963", "LMDh"),
    // LMP2
    ("Dallara P217", "LMP2"),
    ("Ligier JS P217", "LMP2"),
    ("Oreca 07", "LMP2"),
    // LMGT3
    ("Aston Martin Vantage GT3", "LMGT3"),
    ("BMW M4 GT3", "LMGT3"),
    ("Corvette C8.R GT3", "LMGT3"),
    ("Ferrari 296 GT3", "LMGT3"),
    ("Ford Mustang GT3", "LMGT3"),
    ("Lamborghini Huracán GT3 EVO2", "LMGT3"),
    ("McLaren 720S GT3", "LMGT3"),
    ("Mercedes-AMG GT3", "LMGT3"),
    ("Porsche 911 GT3 R", "LMGT3"),
    ("Safety Car", "SafetyCar"),
];

#[derive(Clone, Debug)]
pub struct CarClassTable {
    classes: HashMap<String, String>,
}

impl Default for CarClassTable {
    fn default() -> Self {
        Self {
            classes: DEFAULT_CLASSES
                .iter()
                .map(|(model, class)| (model.to_string(), class.to_string()))
                .collect(),
        }
    }
}

impl CarClassTable {
    /// Class for a car model name, `"Unknown"` when the model is not listed.
    pub fn class_of(&self, model: &str) -> &str {
        self.classes
            .get(model)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CLASS)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Add or replace entries. Later entries win.
    pub fn merge<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.classes.extend(entries);
    }

    /// Built-in table with a JSON object `{"model": "class", ...}` merged over it.
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let class_err = |reason: String| TelemetryError::ClassTable {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| class_err(e.to_string()))?;
        let overrides: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|e| class_err(e.to_string()))?;

        let mut table = Self::default();
        log::info!("Loaded {} car class overrides from {}", overrides.len(), path.display());
        table.merge(overrides);
        Ok(table)
    }
}
