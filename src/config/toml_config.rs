use crate::core::fare::FareRates;
use crate::core::ingestion::GroupingMode;
use crate::utils::error::{FareError, Result};
use crate::utils::validation::{
    validate_non_negative, validate_path, validate_positive_number, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File-based configuration. Every section and key is optional; command
/// line flags win over values found here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub io: IoConfig,
    pub pipeline: PipelineConfig,
    pub filter: FilterConfig,
    pub rates: FareRates,
    pub clock: ClockConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: Option<usize>,
    pub input_buffer: Option<usize>,
    pub output_buffer: Option<usize>,
    pub grouping: Option<GroupingMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub max_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset of local time from UTC used for the night window.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub metrics_file: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FareError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FareError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left untouched.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FareError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(input) = &self.io.input {
            validate_path("io.input", input)?;
        }
        if let Some(output) = &self.io.output {
            validate_path("io.output", output)?;
        }
        if let Some(workers) = self.pipeline.workers {
            validate_positive_number("pipeline.workers", workers, 1)?;
        }
        if let Some(buffer) = self.pipeline.input_buffer {
            validate_positive_number("pipeline.input_buffer", buffer, 1)?;
        }
        if let Some(buffer) = self.pipeline.output_buffer {
            validate_positive_number("pipeline.output_buffer", buffer, 1)?;
        }
        if let Some(speed) = self.filter.max_speed_kmh {
            validate_non_negative("filter.max_speed_kmh", speed)?;
        }
        if let Some(metrics_file) = &self.monitoring.metrics_file {
            validate_path("monitoring.metrics_file", metrics_file)?;
        }
        self.rates.validate()
    }
}
