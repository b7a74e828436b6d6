//! Per-year counters for sequential document numbers
//!
//! Stored in `.dlab/sequences.json` as `{ "<series>": { "<year>": last } }`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::lab::{Lab, LabError};

const SEQUENCE_FILE: &str = "sequences.json";

/// Last number used per series and year
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(flatten)]
    series: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Sequences {
    fn path(lab: &Lab) -> PathBuf {
        lab.dlab_dir().join(SEQUENCE_FILE)
    }

    pub fn load(lab: &Lab) -> Result<Self, LabError> {
        let path = Self::path(lab);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| LabError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| LabError::Parse {
            path,
            message: e.to_string(),
        })
    }

    pub fn save(&self, lab: &Lab) -> Result<(), LabError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| LabError::Serialize(e.to_string()))?;
        fs::write(Self::path(lab), content).map_err(|e| LabError::Io(e.to_string()))
    }

    /// Last number handed out in a series for a year (0 if none)
    pub fn current(&self, series: &str, year: i32) -> u32 {
        self.series
            .get(series)
            .and_then(|years| years.get(&year.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Advance the counter and return the new number
    ///
    /// `floor` is the highest number known to be in use, so a lost or stale
    /// counter file never hands out a duplicate.
    pub fn advance(&mut self, series: &str, year: i32, floor: u32) -> u32 {
        let next = self.current(series, year).max(floor) + 1;
        self.series
            .entry(series.to_string())
            .or_default()
            .insert(year.to_string(), next);
        next
    }
}
