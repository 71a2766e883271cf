//! Error types and exit codes for jet-engine

use std::fmt;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured description of a failed source analysis.
///
/// Carried across the worker pool boundary so the caller sees where the
/// offending file broke, not just that the build failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub message: String,
    pub code: Option<String>,
    pub stack: Option<String>,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl BuildFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filename) = &self.filename {
            write!(f, "{}", filename)?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{}:{}", line, column)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        Ok(())
    }
}

/// Main error type for jet-engine operations
#[derive(Error, Debug)]
pub enum JetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Build failed: {0}")]
    Analyze(BuildFailure),

    #[error("Module {module_id} is defined twice in package {package} ({first} and {second})")]
    DuplicateModule {
        package: String,
        module_id: String,
        first: String,
        second: String,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Remote error: {message}")]
    Remote { message: String },

    #[error("Watch error: {message}")]
    Watch { message: String },

    #[error("Background task failed: {message}")]
    Join { message: String },
}

impl JetError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Convert error to a process exit code:
    /// - 1: IO / configuration error
    /// - 2: Source analysis failure
    /// - 3: Duplicate module id within a package
    /// - 4: Anything else (remote, watch, request, task)
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    fn exit_status(&self) -> u8 {
        match self {
            Self::Io(_) | Self::Json(_) | Self::Config { .. } => 1,
            Self::Analyze(_) => 2,
            Self::DuplicateModule { .. } => 3,
            Self::InvalidRequest { .. }
            | Self::Remote { .. }
            | Self::Watch { .. }
            | Self::Join { .. } => 4,
        }
    }
}

impl From<reqwest::Error> for JetError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote {
            message: e.to_string(),
        }
    }
}

impl From<notify::Error> for JetError {
    fn from(e: notify::Error) -> Self {
        Self::Watch {
            message: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for JetError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join {
            message: e.to_string(),
        }
    }
}

/// Result type alias for jet-engine operations
pub type Result<T> = std::result::Result<T, JetError>;
