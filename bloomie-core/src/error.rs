//! Error types for bloomie-core.

use thiserror::Error;

/// Result type alias for bloomie core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Reactor layout with no devices or no channels.
    #[error("invalid reactor layout: {0}")]
    InvalidLayout(String),

    /// Device/channel slot that does not exist in the registry.
    #[error("unknown reactor: device {device}, channel {channel}")]
    UnknownReactor { device: String, channel: usize },

    /// Color string that could not be parsed.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// Highlight keyword that could not be compiled.
    #[error("invalid highlight pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Per-curve failure while building a plot scene.
///
/// These never abort a render pass; the affected curve is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Timestamp that is neither RFC 3339 nor naive ISO-8601.
    #[error("unparseable timestamp {0:?}")]
    BadTimestamp(String),

    /// Window produced no points to draw.
    #[error("no points left to draw")]
    EmptyWindow,
}
