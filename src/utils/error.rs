use serde::Serialize;
use thiserror::Error;

/// 批次層級的解析錯誤，任何一個都會在渲染開始前中止整個批次
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("CSV input must contain a header row and at least one data row")]
    Empty,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Malformed CSV input: {0}")]
    Malformed(String),
}

/// 單筆記錄的渲染錯誤，只記錄在報告中，不會中斷批次
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum RenderError {
    #[error("Render surface failed to load: {0}")]
    LoadFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive entry '{entry}': {source}")]
    Entry {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No successful certificates to package")]
    NothingToPack,
}

#[derive(Error, Debug)]
pub enum CertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid parameter '{key}': {reason}")]
    ParameterError { key: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Rendering,
    Packaging,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CertError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CertError::Parse(_) | CertError::CsvError(_) | CertError::ParameterError { .. } => {
                ErrorCategory::Input
            }
            CertError::ConfigValidationError { .. }
            | CertError::InvalidConfigValueError { .. }
            | CertError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CertError::Render(_) => ErrorCategory::Rendering,
            CertError::Packaging(_) => ErrorCategory::Packaging,
            CertError::IoError(_) | CertError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆渲染失敗可以重試
            CertError::Render(_) => ErrorSeverity::Medium,
            CertError::Parse(_)
            | CertError::CsvError(_)
            | CertError::ParameterError { .. }
            | CertError::ConfigValidationError { .. }
            | CertError::InvalidConfigValueError { .. }
            | CertError::MissingConfigError { .. } => ErrorSeverity::High,
            CertError::Packaging(_) | CertError::IoError(_) | CertError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CertError::Parse(ParseError::Empty) => {
                "The CSV file has no data rows to generate certificates from".to_string()
            }
            CertError::Parse(ParseError::MissingColumns(cols)) => {
                format!("The CSV file is missing required columns: {}", cols.join(", "))
            }
            CertError::Packaging(_) => {
                "Certificates were rendered but the archive could not be built".to_string()
            }
            CertError::Render(e) => format!("Certificate could not be rendered: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CertError::Parse(ParseError::Empty) => {
                "Add at least one data row below the header line"
            }
            CertError::Parse(ParseError::MissingColumns(_)) => {
                "Download the CSV template with `certgen csv-template` and keep its header row"
            }
            CertError::Parse(ParseError::Malformed(_)) | CertError::CsvError(_) => {
                "Check the CSV file for unbalanced quotes or invalid UTF-8"
            }
            CertError::ParameterError { .. } => "Pass parameters as key=value pairs",
            CertError::ConfigValidationError { .. }
            | CertError::InvalidConfigValueError { .. }
            | CertError::MissingConfigError { .. } => {
                "Review the configuration file and command-line flags"
            }
            CertError::Render(_) => "Retry with a longer --timeout-ms or check the parameter values",
            CertError::Packaging(_) => "Check available memory and retry the batch",
            CertError::IoError(_) => "Check that the output directory exists and is writable",
            CertError::SerializationError(_) => "Retry without --report or report a bug",
        }
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
