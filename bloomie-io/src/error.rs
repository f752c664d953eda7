//! I/O error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for bloomie-io operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Umbrella error for callers that do not care which stage failed.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Source(#[from] DataSourceError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] bloomie_core::Error),
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File is not valid YAML for the configuration schema.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A value is out of range or unparseable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Instrument control API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server answered with a non-success status.
    #[error("{status}: {body}")]
    Remote { status: u16, body: String },

    /// Server could not be reached.
    #[error("connection failed: {0}")]
    Transport(String),

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Username not registered on the instrument.
    #[error("user not found: {0:?}")]
    UnknownUser(String),

    /// Device listing was empty.
    #[error("no devices reported by the instrument")]
    NoDevices,
}

impl From<ureq::Error> for ApiError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(status, response) => ApiError::Remote {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

/// Failures while preparing the instrument for a recording session.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Session parameters rejected before contacting the instrument.
    #[error("invalid session settings: {0}")]
    Config(String),

    /// A remote call failed.
    #[error("instrument error: {0}")]
    Api(#[from] ApiError),

    /// Samples were still listed after cleanup.
    #[error("instrument still lists {remaining} sample(s) after cleanup; restart the backend")]
    NotCleared { remaining: usize },
}

/// Malformed batch message.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not JSON, or no `readings` array.
    #[error("malformed batch: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary frame that is not UTF-8 text.
    #[error("binary message is not UTF-8")]
    NotText,
}

/// Failures of a data source. All of them end the acquisition loop.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    Connection(Box<tungstenite::Error>),

    /// Peer closed the stream.
    #[error("data stream closed")]
    Closed,

    /// Message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<tungstenite::Error> for DataSourceError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                DataSourceError::Closed
            }
            other => DataSourceError::Connection(Box::new(other)),
        }
    }
}

/// Record file errors.
#[derive(Error, Debug)]
pub enum RecordError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data row that does not have the record layout.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Reasons the acquisition loop stopped early.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Registry was never initialized.
    #[error("recorder has no reactors; call initialize first")]
    NotInitialized,

    /// Data source failed.
    #[error(transparent)]
    Source(#[from] DataSourceError),

    /// Writing a record row failed.
    #[error("cannot write record file: {0}")]
    Write(#[from] std::io::Error),
}
