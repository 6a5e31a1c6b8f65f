use std::path::PathBuf;

use crate::client::CompletionError;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    ParseError { file: PathBuf, message: String },
    ExtractionError { file: PathBuf, line: usize, message: String },
    InvalidArgument(String),
    Completion(CompletionError),
    Cancelled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::ExtractionError {
                file,
                line,
                message,
            } => write!(
                f,
                "Failed to extract route at {}:{}: {}",
                file.display(),
                line,
                message
            ),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Completion(e) => write!(f, "{}", e),
            Error::Cancelled => write!(f, "Operation cancelled by user"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Completion(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CompletionError> for Error {
    fn from(err: CompletionError) -> Self {
        Error::Completion(err)
    }
}
