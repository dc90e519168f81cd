use thiserror::Error;

#[derive(Error, Debug)]
pub enum FareError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FareError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FareError::ConfigValidationError { .. }
            | FareError::InvalidConfigValueError { .. }
            | FareError::MissingConfigError { .. } => ErrorCategory::Configuration,
            FareError::CsvError(_) | FareError::MalformedRecord { .. } => ErrorCategory::Input,
            FareError::SerializationError(_) | FareError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
            FareError::IoError(_) | FareError::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FareError::MalformedRecord { .. } => ErrorSeverity::Low,
            FareError::CsvError(_) | FareError::SerializationError(_) => ErrorSeverity::Medium,
            FareError::ConfigValidationError { .. }
            | FareError::InvalidConfigValueError { .. }
            | FareError::MissingConfigError { .. }
            | FareError::ProcessingError { .. } => ErrorSeverity::High,
            FareError::IoError(_) | FareError::TaskError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FareError::CsvError(_) | FareError::MalformedRecord { .. } => {
                "Check that the input is a CSV file with columns id,lat,lng,timestamp"
            }
            FareError::IoError(_) => {
                "Check that the input file exists and the output directory is writable"
            }
            FareError::SerializationError(_) => "Check that the metrics file path is writable",
            FareError::ConfigValidationError { .. }
            | FareError::InvalidConfigValueError { .. }
            | FareError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags and run again"
            }
            FareError::ProcessingError { .. } => {
                "Re-run with --verbose to see which delivery failed"
            }
            FareError::TaskError(_) => "A background task panicked; re-run with RUST_LOG=debug",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FareError::IoError(e) => format!("Could not access a file: {}", e),
            FareError::CsvError(e) => format!("Could not read the CSV data: {}", e),
            FareError::MissingConfigError { field } => {
                format!("The setting '{}' is required", field)
            }
            FareError::InvalidConfigValueError { field, reason, .. } => {
                format!("The setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FareError>;
