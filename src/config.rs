use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::archive::Channel;
use crate::trigger::ThresholdSpec;
use crate::SweepError;

/// One swept trigger parameter: a monitored channel and its candidate
/// thresholds. `name` and `units` are echoed verbatim into result tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub units: String,
    pub channel: Channel,
    #[serde(default)]
    pub thresholds: Vec<f64>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde_as(as = "DefaultOnNull")]
    pub archive_path: PathBuf,
    #[serde_as(as = "DefaultOnNull")]
    pub output_root: PathBuf,
    #[serde_as(as = "DefaultOnNull")]
    pub success_flux_key: String,
    #[serde_as(as = "DefaultOnNull")]
    pub success_flux_value: f64,
    pub parameters: Vec<ParameterSpec>,
    pub combinations: Vec<Vec<f64>>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from("GOES_XRS_historical.json"),
            output_root: PathBuf::from("output-flare-trigger-sweep"),
            success_flux_key: "C5".to_string(),
            success_flux_value: 5.0e-6,
            parameters: vec![ParameterSpec {
                name: "xrsb".to_string(),
                units: "W/m^2".to_string(),
                channel: Channel::Xrsb,
                thresholds: vec![1.0e-6, 2.0e-6, 4.0e-6, 6.0e-6, 8.0e-6, 1.0e-5],
            }],
            combinations: Vec::new(),
        }
    }
}

/// One point of the threshold grid. Names and units are shared by every
/// combination of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCombination {
    pub index: usize,
    pub values: Vec<f64>,
    pub names: Vec<String>,
    pub units: Vec<String>,
    pub spec: ThresholdSpec,
}

impl ParameterCombination {
    /// Threshold values joined with `_`, used to name this combination's outputs.
    pub fn label(&self) -> String {
        threshold_label(&self.values)
    }
}

fn threshold_label(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{value:e}"))
        .collect::<Vec<_>>()
        .join("_")
}

impl SweepConfig {
    pub fn from_path(path: &Path) -> Result<Self, SweepError> {
        let raw = fs::read_to_string(path)?;
        let config: SweepConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw)?,
            _ => serde_json::from_str(&raw)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.parameters.is_empty() {
            return Err(SweepError::InvalidConfig(
                "at least one trigger parameter is required".to_string(),
            ));
        }

        if !(self.success_flux_value.is_finite() && self.success_flux_value > 0.0) {
            return Err(SweepError::InvalidConfig(
                "success_flux_value must be finite and > 0".to_string(),
            ));
        }

        if self.archive_path.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig(
                "archive_path must not be empty".to_string(),
            ));
        }

        if self.output_root.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig(
                "output_root must not be empty".to_string(),
            ));
        }

        if self.success_flux_key.trim().is_empty() {
            return Err(SweepError::InvalidConfig(
                "success_flux_key must not be empty".to_string(),
            ));
        }

        for parameter in &self.parameters {
            if parameter.name.trim().is_empty() {
                return Err(SweepError::InvalidConfig(
                    "parameter names must not be empty".to_string(),
                ));
            }

            if self.combinations.is_empty() && parameter.thresholds.is_empty() {
                return Err(SweepError::InvalidConfig(format!(
                    "parameter {} has no thresholds",
                    parameter.name
                )));
            }

            if parameter.thresholds.iter().any(|value| !value.is_finite()) {
                return Err(SweepError::InvalidConfig(format!(
                    "parameter {} has a non-finite threshold",
                    parameter.name
                )));
            }
        }

        for combination in &self.combinations {
            if combination.len() != self.parameters.len() {
                return Err(SweepError::LengthMismatch {
                    context: "parameter combination",
                    expected: self.parameters.len(),
                    got: combination.len(),
                });
            }

            if combination.iter().any(|value| !value.is_finite()) {
                return Err(SweepError::InvalidConfig(
                    "parameter combinations must be finite".to_string(),
                ));
            }
        }

        // Each combination owns one results file, named by its label.
        let mut labels = HashSet::new();
        for tuple in self.threshold_tuples() {
            let label = threshold_label(&tuple);
            if !labels.insert(label.clone()) {
                return Err(SweepError::InvalidConfig(format!(
                    "threshold combination {label} appears more than once"
                )));
            }
        }

        Ok(())
    }

    /// Threshold tuples in sweep order: the explicit `combinations` when given,
    /// otherwise the Cartesian product of every parameter's thresholds with the
    /// first parameter varying slowest.
    pub fn threshold_tuples(&self) -> Vec<Vec<f64>> {
        if !self.combinations.is_empty() {
            return self.combinations.clone();
        }

        self.parameters
            .iter()
            .fold(vec![Vec::<f64>::new()], |tuples, parameter| {
                tuples
                    .iter()
                    .flat_map(|prefix| {
                        parameter.thresholds.iter().map(move |&value| {
                            let mut tuple = prefix.clone();
                            tuple.push(value);
                            tuple
                        })
                    })
                    .collect()
            })
    }

    pub fn parameter_grid(&self) -> Vec<ParameterCombination> {
        let names: Vec<String> = self.parameters.iter().map(|p| p.name.clone()).collect();
        let units: Vec<String> = self.parameters.iter().map(|p| p.units.clone()).collect();

        self.threshold_tuples()
            .into_iter()
            .enumerate()
            .map(|(index, values)| {
                let pairs = self
                    .parameters
                    .iter()
                    .zip(values.iter())
                    .map(|(parameter, &threshold)| (parameter.channel, threshold))
                    .collect();
                ParameterCombination {
                    index,
                    spec: ThresholdSpec::from_pairs(pairs),
                    values,
                    names: names.clone(),
                    units: units.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_config() -> SweepConfig {
        SweepConfig {
            parameters: vec![
                ParameterSpec {
                    name: "xrsa".to_string(),
                    units: "W/m^2".to_string(),
                    channel: Channel::Xrsa,
                    thresholds: vec![1.0e-7, 1.0e-6],
                },
                ParameterSpec {
                    name: "xrsb".to_string(),
                    units: "W/m^2".to_string(),
                    channel: Channel::Xrsb,
                    thresholds: vec![1.0e-6, 5.0e-6, 1.0e-5],
                },
            ],
            ..SweepConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid_single_channel() {
        let config = SweepConfig::default();
        config.validate().unwrap();
        let grid = config.parameter_grid();
        assert_eq!(grid.len(), 6);
        assert!(grid
            .iter()
            .all(|c| matches!(c.spec, ThresholdSpec::SingleChannel { .. })));
    }

    #[test]
    fn grid_is_cartesian_with_first_parameter_slowest() {
        let grid = two_channel_config().parameter_grid();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0].values, vec![1.0e-7, 1.0e-6]);
        assert_eq!(grid[1].values, vec![1.0e-7, 5.0e-6]);
        assert_eq!(grid[3].values, vec![1.0e-6, 1.0e-6]);
        assert_eq!(grid[5].index, 5);
        assert_eq!(
            grid[4].spec,
            ThresholdSpec::MultiChannel(vec![(Channel::Xrsa, 1.0e-6), (Channel::Xrsb, 5.0e-6)])
        );
        assert_eq!(grid[4].names, vec!["xrsa", "xrsb"]);
    }

    #[test]
    fn explicit_combinations_override_product() {
        let mut config = two_channel_config();
        config.combinations = vec![vec![2.0e-7, 3.0e-6]];
        config.validate().unwrap();
        let grid = config.parameter_grid();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].label(), "2e-7_3e-6");
    }

    #[test]
    fn rejects_combination_arity_mismatch() {
        let mut config = two_channel_config();
        config.combinations = vec![vec![1.0e-6]];
        assert!(matches!(
            config.validate(),
            Err(SweepError::LengthMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_thresholds() {
        let mut config = two_channel_config();
        config.parameters[1].thresholds.clear();
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let raw = r#"{
            "success_flux_key": "M1",
            "success_flux_value": 1e-5,
            "parameters": [
                {"name": "xrsb", "units": "W/m^2", "channel": "xrsb", "thresholds": [1e-5]}
            ]
        }"#;
        let config: SweepConfig = serde_json::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.archive_path, PathBuf::from("GOES_XRS_historical.json"));
        assert_eq!(config.output_root, PathBuf::from("output-flare-trigger-sweep"));
        assert_eq!(config.success_flux_key, "M1");
        assert_eq!(config.parameter_grid()[0].label(), "1e-5");
    }

    #[test]
    fn null_success_value_and_output_root_are_rejected() {
        let null_value = r#"{"success_flux_value": null}"#;
        let config: SweepConfig = serde_json::from_str(null_value).unwrap();
        assert_eq!(config.success_flux_value, 0.0);
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(msg)) if msg.contains("success_flux_value")
        ));

        let null_root = r#"{"output_root": null}"#;
        let config: SweepConfig = serde_json::from_str(null_root).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(msg)) if msg.contains("output_root")
        ));
    }

    #[test]
    fn rejects_non_positive_success_value() {
        let mut config = SweepConfig::default();
        config.success_flux_value = -5.0e-6;
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_duplicate_combinations() {
        let mut config = two_channel_config();
        config.combinations = vec![
            vec![1.0e-7, 1.0e-6],
            vec![2.0e-7, 1.0e-6],
            vec![1.0e-7, 0.000001],
        ];
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(msg)) if msg.contains("1e-7_1e-6")
        ));
    }

    #[test]
    fn rejects_duplicate_thresholds_in_product() {
        let mut config = two_channel_config();
        config.parameters[0].thresholds = vec![1.0e-7, 1.0e-7];
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn channel_names_parse_case_insensitively() {
        let raw = r#"{
            "parameters": [
                {"name": "b", "channel": "XRSB", "thresholds": [1e-6]},
                {"name": "a", "channel": "Xrsa", "thresholds": [1e-7]}
            ]
        }"#;
        let config: SweepConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.parameters[0].channel, Channel::Xrsb);
        assert_eq!(config.parameters[1].channel, Channel::Xrsa);

        let written = serde_json::to_string(&config.parameters[0]).unwrap();
        assert!(written.contains(r#""channel":"xrsb""#));
    }

    #[test]
    fn unknown_channel_names_the_channel() {
        let raw = r#"{"parameters": [{"name": "c", "channel": "xrsc", "thresholds": [1e-6]}]}"#;
        let err = serde_json::from_str::<SweepConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("xrsc"));
    }

    #[test]
    fn loads_toml() {
        let raw = r#"
            success_flux_key = "C5"
            success_flux_value = 5e-6

            [[parameters]]
            name = "xrsa"
            units = "W/m^2"
            channel = "xrsa"
            thresholds = [1e-7]

            [[parameters]]
            name = "xrsb"
            units = "W/m^2"
            channel = "xrsb"
            thresholds = [1e-6, 1e-5]
        "#;
        let config: SweepConfig = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.parameter_grid().len(), 2);
    }
}
