//! All errors that can occur in the asesim library.

use std::fmt;

#[derive(Debug)]
pub enum AsesimError {
    InvalidModel(u8),
    DimensionMismatch { expected: usize, found: usize },
    MissingInput(String),
    ReadError(String),
    SequenceError(String),
    InvalidProbabilities(String),
    InvalidParameter(String),
    IoError(std::io::Error),
}

pub type Result<T> = std::result::Result<T, AsesimError>;

impl fmt::Display for AsesimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AsesimError::InvalidModel(model) => {
                write!(f, "InvalidModel: {model} is not one of 1, 2, 3 or 4")
            }
            AsesimError::DimensionMismatch { expected, found } => {
                write!(
                    f,
                    "DimensionMismatch: expected {expected} transcripts, found {found}"
                )
            }
            AsesimError::MissingInput(path) => write!(f, "MissingInput: {path} does not exist"),
            AsesimError::ReadError(message) => write!(f, "ReadError: {message}"),
            AsesimError::SequenceError(message) => write!(f, "SequenceError: {message}"),
            AsesimError::InvalidProbabilities(message) => {
                write!(f, "InvalidProbabilities: {message}")
            }
            AsesimError::InvalidParameter(message) => write!(f, "InvalidParameter: {message}"),
            AsesimError::IoError(error) => write!(f, "IoError: {error}"),
        }
    }
}

impl std::error::Error for AsesimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AsesimError::IoError(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AsesimError {
    fn from(error: std::io::Error) -> Self {
        AsesimError::IoError(error)
    }
}

impl From<csv::Error> for AsesimError {
    fn from(error: csv::Error) -> Self {
        AsesimError::ReadError(error.to_string())
    }
}
