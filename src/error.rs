use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(scheduleai::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(scheduleai::config))]
    Config(String),

    #[error("Schedule generation failed: {0}")]
    #[diagnostic(
        code(scheduleai::generation),
        help("Rephrase the request or try again")
    )]
    Generation(String),

    #[error("Request timed out after {0} seconds")]
    #[diagnostic(code(scheduleai::timeout))]
    Timeout(u64),

    #[error("Request was cancelled")]
    #[diagnostic(code(scheduleai::cancelled))]
    Cancelled,

    #[error("Another request is already in progress")]
    #[diagnostic(code(scheduleai::busy))]
    Busy,

    #[error("Invalid event: {0}")]
    #[diagnostic(code(scheduleai::validation))]
    Validation(ValidationErrors),

    #[error("Schedule not found: {0}")]
    #[diagnostic(code(scheduleai::not_found))]
    NotFound(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(scheduleai::storage))]
    Storage(String),

    #[error("Calendar export error: {0}")]
    #[diagnostic(code(scheduleai::export))]
    Export(String),

    #[error("Planner error: {0}")]
    #[diagnostic(code(scheduleai::planner))]
    Planner(String),

    #[error(transparent)]
    #[diagnostic(code(scheduleai::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(scheduleai::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(scheduleai::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field-level failures found while validating an edited event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message recorded for a field, if any
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create generation errors
pub fn generation_error(message: &str) -> Error {
    Error::Generation(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create calendar export errors
pub fn export_error(message: &str) -> Error {
    Error::Export(message.to_string())
}

/// Helper to create planner errors
pub fn planner_error(message: &str) -> Error {
    Error::Planner(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
