//! Error types for the marble-viz engine
use thiserror::Error;

/// Engine errors surfaced to the caller.
///
/// Only initialization and decode failures reach the user; everything that
/// can happen inside the frame loop is recovered locally.
#[derive(Error, Debug)]
pub enum Error {
    /// Audio output device could not be opened
    #[error("audio output unavailable: {0}")]
    Initialization(String),

    /// Supplied audio bytes could not be decoded
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Effect variant tag not recognised
    #[error("unknown effect variant: {0}")]
    UnknownVariant(String),

    /// Color string is not a `#rrggbb` hex value
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Error::Io(io),
            other => Error::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
