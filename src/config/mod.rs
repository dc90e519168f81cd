pub mod cli;
pub mod toml_config;

use crate::core::dispatcher::{DEFAULT_OUTPUT_BUFFER, DEFAULT_WORKERS};
use crate::core::fare::FareRates;
use crate::core::filter::DEFAULT_MAX_SPEED_KMH;
use crate::core::ingestion::GroupingMode;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_negative, validate_path, validate_positive_number, validate_range,
    validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_OUTPUT_PATH: &str = "fare_estimates.csv";
pub const DEFAULT_INPUT_BUFFER: usize = 100;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "fare-estimator")]
#[command(about = "Estimates delivery fares from GPS telemetry")]
pub struct CliConfig {
    /// Input CSV file (id,lat,lng,timestamp)
    #[arg(long)]
    pub input: Option<String>,

    /// Output CSV file [default: fare_estimates.csv]
    #[arg(long)]
    pub output: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Number of concurrent fare workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Capacity of the estimate channel between workers and writer
    #[arg(long)]
    pub output_buffer: Option<usize>,

    #[arg(long, value_enum)]
    pub grouping: Option<GroupingMode>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub metrics_file: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log process CPU/memory at each phase
    #[arg(long)]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Fully resolved run configuration: defaults, then the TOML file, then
/// command line overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub input_path: Option<String>,
    pub output_path: String,
    pub workers: usize,
    pub input_buffer: usize,
    pub output_buffer: usize,
    pub grouping: GroupingMode,
    pub max_speed_kmh: f64,
    pub rates: FareRates,
    pub utc_offset_minutes: i32,
    pub monitor: bool,
    pub metrics_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            workers: DEFAULT_WORKERS,
            input_buffer: DEFAULT_INPUT_BUFFER,
            output_buffer: DEFAULT_OUTPUT_BUFFER,
            grouping: GroupingMode::default(),
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
            rates: FareRates::default(),
            utc_offset_minutes: 0,
            monitor: false,
            metrics_file: None,
        }
    }
}

impl Settings {
    pub fn from_toml(config: TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            input_path: config.io.input,
            output_path: config.io.output.unwrap_or(defaults.output_path),
            workers: config.pipeline.workers.unwrap_or(defaults.workers),
            input_buffer: config.pipeline.input_buffer.unwrap_or(defaults.input_buffer),
            output_buffer: config.pipeline.output_buffer.unwrap_or(defaults.output_buffer),
            grouping: config.pipeline.grouping.unwrap_or(defaults.grouping),
            max_speed_kmh: config.filter.max_speed_kmh.unwrap_or(defaults.max_speed_kmh),
            rates: config.rates,
            utc_offset_minutes: config.clock.utc_offset_minutes,
            monitor: config.monitoring.enabled,
            metrics_file: config.monitoring.metrics_file,
        }
    }

    #[cfg(feature = "cli")]
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                Self::from_toml(file)
            }
            None => Self::default(),
        };

        if let Some(input) = &cli.input {
            settings.input_path = Some(input.clone());
        }
        if let Some(output) = &cli.output {
            settings.output_path = output.clone();
        }
        if let Some(workers) = cli.workers {
            settings.workers = workers;
        }
        if let Some(buffer) = cli.output_buffer {
            settings.output_buffer = buffer;
        }
        if let Some(grouping) = cli.grouping {
            settings.grouping = grouping;
        }
        if let Some(metrics_file) = &cli.metrics_file {
            settings.metrics_file = Some(metrics_file.clone());
        }
        settings.monitor |= cli.monitor;

        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        let input = validate_required_field("input", &self.input_path)?;
        validate_path("input", input)?;
        validate_path("output", &self.output_path)?;
        validate_positive_number("workers", self.workers, 1)?;
        validate_positive_number("input_buffer", self.input_buffer, 1)?;
        validate_positive_number("output_buffer", self.output_buffer, 1)?;
        validate_non_negative("max_speed_kmh", self.max_speed_kmh)?;
        validate_range("utc_offset_minutes", self.utc_offset_minutes, -1439, 1439)?;
        if let Some(metrics_file) = &self.metrics_file {
            validate_path("metrics_file", metrics_file)?;
        }
        self.rates.validate()
    }
}

impl ConfigProvider for Settings {
    fn input_path(&self) -> &str {
        self.input_path.as_deref().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn worker_count(&self) -> usize {
        self.workers
    }

    fn input_buffer(&self) -> usize {
        self.input_buffer
    }

    fn output_buffer(&self) -> usize {
        self.output_buffer
    }

    fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    fn rates(&self) -> &FareRates {
        &self.rates
    }

    fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }
}
