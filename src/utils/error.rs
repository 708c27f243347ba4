use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration file not found: {}", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Malformed configuration at '{field}': {message}")]
    ConfigMalformed { field: String, message: String },

    #[error("Unsupported generator kind '{kind}' for column '{column}'")]
    UnsupportedGeneratorKind { column: String, kind: String },

    #[error("Missing required columns: {}", missing.join(", "))]
    MissingRequiredColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("IO error on '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Schema,
    Io,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigMalformed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing { .. }
            | Self::ConfigMalformed { .. }
            | Self::UnsupportedGeneratorKind { .. } => ErrorCategory::Configuration,
            Self::MissingRequiredColumns { .. } => ErrorCategory::Schema,
            Self::IoError { .. } => ErrorCategory::Io,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Schema | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConfigMissing { path } => {
                format!("Config file '{}' not found", path.display())
            }
            Self::ConfigMalformed { field, message } => {
                format!("Config key '{}' is invalid: {}", field, message)
            }
            Self::UnsupportedGeneratorKind { column, kind } => format!(
                "Generated column '{}' uses unknown type '{}'",
                column, kind
            ),
            Self::MissingRequiredColumns { missing, available } => format!(
                "Input file is missing source columns: {} (available: {})",
                missing.join(", "),
                available.join(", ")
            ),
            Self::IoError { path, source } => {
                format!("Could not access '{}': {}", path.display(), source)
            }
            Self::CsvError(e) => format!("Could not parse CSV data: {}", e),
            Self::SerializationError(e) => format!("Could not serialize output: {}", e),
            Self::ProcessingError { message } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigMissing { .. } => {
                "Create the config file or point to it with --config"
            }
            Self::ConfigMalformed { .. } => "Fix the named key in the config file",
            Self::UnsupportedGeneratorKind { .. } => {
                "Use one of: sequential, random_hex, uuid, static, timestamp"
            }
            Self::MissingRequiredColumns { .. } => {
                "Update columns.source_mapping to match the input header line"
            }
            Self::IoError { .. } => "Check that the path exists and is readable/writable",
            Self::CsvError(_) => "Check that the file is valid comma-separated CSV",
            Self::SerializationError(_) => "Re-run with --verbose for details",
            Self::ProcessingError { .. } => "Check the input data and re-run",
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
