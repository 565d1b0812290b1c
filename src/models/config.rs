// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::error::ConfigError;
use crate::models::constants::DEFAULT_ALERT_THRESHOLD;
use crate::models::types::EvidenceAssignment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub id: String,
    pub label: String,
    pub options: Vec<String>,
    pub default: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    pub label: String,
}

/// What the operator can observe and which diagnoses are shown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub sensors: Vec<SensorSpec>,
    pub targets: Vec<TargetSpec>,
    pub critical_states: Vec<String>,
    pub nominal_states: Vec<String>,
    pub alert_threshold: f64,
}

fn sensor(id: &str, label: &str, options: [&str; 3], default: &str) -> SensorSpec {
    SensorSpec {
        id: id.to_string(),
        label: label.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        default: default.to_string(),
    }
}

fn target(id: &str, label: &str) -> TargetSpec {
    TargetSpec {
        id: id.to_string(),
        label: label.to_string(),
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sensors: vec![
                sensor("T_sensor", "Sensor de Temperatura", ["baja", "normal", "alta"], "normal"),
                sensor("pH_sensor", "Sensor de pH", ["acido", "neutro", "alcalino"], "neutro"),
                sensor("Gas_sensor", "Sensor de Gas", ["bajo", "normal", "alto"], "normal"),
                sensor("Flow_sensor", "Sensor de Caudal", ["bajo", "normal", "alto"], "normal"),
                sensor("Presion_sensor", "Sensor de Presión", ["baja", "normal", "alta"], "normal"),
            ],
            targets: vec![
                target("EstadoMicrobiano", "Estado Microbiano"),
                target("EstadoOperativo", "Estado Operativo"),
            ],
            critical_states: vec!["Degradado".into(), "FallaMecanica".into(), "Fuga".into()],
            nominal_states: vec!["Bueno".into(), "Normal".into()],
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("no diagnostic targets configured".into()));
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(ConfigError::Invalid(format!(
                "alert threshold {} outside [0, 1]",
                self.alert_threshold
            )));
        }
        for sensor in &self.sensors {
            if sensor.options.is_empty() {
                return Err(ConfigError::Invalid(format!("sensor {} has no options", sensor.id)));
            }
            if !sensor.options.contains(&sensor.default) {
                return Err(ConfigError::Invalid(format!(
                    "default '{}' of sensor {} is not one of its options",
                    sensor.default, sensor.id
                )));
            }
        }
        Ok(())
    }

    pub fn sensor(&self, id: &str) -> Option<&SensorSpec> {
        self.sensors.iter().find(|s| s.id == id)
    }

    pub fn default_evidence(&self) -> EvidenceAssignment {
        self.sensors
            .iter()
            .map(|s| (s.id.clone(), s.default.clone()))
            .collect()
    }

    pub fn is_critical(&self, state: &str) -> bool {
        self.critical_states.iter().any(|s| s == state)
    }

    pub fn is_nominal(&self, state: &str) -> bool {
        self.nominal_states.iter().any(|s| s == state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_evidence().len(), 5);
        assert_eq!(config.default_evidence()["pH_sensor"], "neutro");
    }

    #[test]
    fn default_outside_options_is_rejected() {
        let mut config = DashboardConfig::default();
        config.sensors[0].default = "tibia".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn threshold_must_be_a_probability() {
        let mut config = DashboardConfig::default();
        config.alert_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_json_file() {
        let path = std::env::temp_dir().join(format!("dashboard-{}.json", uuid::Uuid::new_v4()));
        let config = DashboardConfig::default();
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = DashboardConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
