//! Read-only flare catalogue consumed by the sweep.
//!
//! Records are loaded once and never mutated. Index-based lookups
//! (`flare_index -> record`) stay stable for a whole sweep.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::SweepError;

/// Flux series a trigger threshold can be applied to. Serialized lowercase,
/// parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Channel {
    /// Short-wavelength channel (0.5-4 Å).
    Xrsa,
    /// Long-wavelength channel (1-8 Å), the one flare classes are defined on.
    Xrsb,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Xrsa => "xrsa",
            Channel::Xrsb => "xrsb",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = SweepError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "xrsa" => Ok(Channel::Xrsa),
            "xrsb" => Ok(Channel::Xrsb),
            other => Err(SweepError::UnknownChannel(other.to_string())),
        }
    }
}

/// One historical flare event with its sampled light curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareRecord {
    #[serde(rename = "flare ID")]
    pub id: String,
    pub time: Vec<f64>,
    pub xrsa: Vec<f64>,
    pub xrsb: Vec<f64>,
    #[serde(rename = "peak time")]
    pub peak_time: f64,
    #[serde(rename = "class")]
    pub flare_class: String,
    #[serde(rename = "peak flux")]
    pub peak_flux: f64,
    #[serde(rename = "start to peak time")]
    pub start_to_peak_time: f64,
    #[serde(rename = "background flux")]
    pub background_flux: f64,
}

impl FlareRecord {
    pub fn series(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Xrsa => &self.xrsa,
            Channel::Xrsb => &self.xrsb,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn check_lengths(&self) -> Result<(), SweepError> {
        for (context, got) in [("xrsa", self.xrsa.len()), ("xrsb", self.xrsb.len())] {
            if got != self.time.len() {
                return Err(SweepError::LengthMismatch {
                    context,
                    expected: self.time.len(),
                    got,
                });
            }
        }
        Ok(())
    }
}

/// Ordered, immutable collection of flare records.
#[derive(Debug, Clone, Default)]
pub struct FlareArchive {
    records: Vec<FlareRecord>,
}

impl FlareArchive {
    pub fn new(records: Vec<FlareRecord>) -> Result<Self, SweepError> {
        for record in &records {
            record.check_lengths()?;
        }
        Ok(Self { records })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SweepError> {
        let raw = fs::read_to_string(path)?;
        let records: Vec<FlareRecord> = serde_json::from_str(&raw)?;
        Self::new(records)
    }

    /// Records in archive order.
    pub fn flares(&self) -> &[FlareRecord] {
        &self.records
    }

    pub fn get(&self, flare_index: usize) -> Option<&FlareRecord> {
        self.records.get(flare_index)
    }

    /// First record carrying `id`. Trailing windows can repeat an identifier,
    /// and only the earliest one is ever returned.
    pub fn find_first(&self, id: &str) -> Option<&FlareRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Flare sampled once a minute with identical channels.
    pub(crate) fn flat_flare(id: &str, xrsa: Vec<f64>, xrsb: Vec<f64>) -> FlareRecord {
        let time = (0..xrsa.len()).map(|i| i as f64 * 60.0).collect();
        FlareRecord {
            id: id.to_string(),
            time,
            xrsa,
            xrsb,
            peak_time: 0.0,
            flare_class: "C1.0".to_string(),
            peak_flux: 1.0e-6,
            start_to_peak_time: 0.0,
            background_flux: 1.0e-8,
        }
    }

    #[test]
    fn channel_parses_case_insensitively() {
        assert_eq!("XRSB".parse::<Channel>().unwrap(), Channel::Xrsb);
        assert_eq!(" xrsa ".parse::<Channel>().unwrap(), Channel::Xrsa);
        assert!(matches!(
            "xrsc".parse::<Channel>(),
            Err(SweepError::UnknownChannel(name)) if name == "xrsc"
        ));
    }

    #[test]
    fn rejects_misaligned_series() {
        let mut record = flat_flare("a", vec![1.0; 4], vec![1.0; 4]);
        record.xrsb.pop();
        let err = FlareArchive::new(vec![record]).unwrap_err();
        assert!(matches!(
            err,
            SweepError::LengthMismatch {
                context: "xrsb",
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn find_first_prefers_earliest_duplicate() {
        let mut first = flat_flare("dup", vec![1.0; 3], vec![1.0; 3]);
        first.flare_class = "M1.0".to_string();
        let mut second = flat_flare("dup", vec![1.0; 3], vec![1.0; 3]);
        second.flare_class = "X1.0".to_string();
        let archive = FlareArchive::new(vec![first, second]).unwrap();

        assert_eq!(archive.find_first("dup").unwrap().flare_class, "M1.0");
        assert!(archive.find_first("missing").is_none());
    }

    #[test]
    fn loads_catalogue_column_names() {
        let raw = r#"[{
            "flare ID": "20170906_1153",
            "time": [0.0, 60.0],
            "xrsa": [1e-7, 2e-7],
            "xrsb": [1e-6, 2e-6],
            "peak time": 60.0,
            "class": "X9.3",
            "peak flux": 9.3e-4,
            "start to peak time": 9.0,
            "background flux": 1e-7
        }]"#;
        let records: Vec<FlareRecord> = serde_json::from_str(raw).unwrap();
        let archive = FlareArchive::new(records).unwrap();

        let flare = archive.get(0).unwrap();
        assert_eq!(flare.id, "20170906_1153");
        assert_eq!(flare.series(Channel::Xrsb), &[1e-6, 2e-6]);
        assert_eq!(flare.flare_class, "X9.3");
    }
}
