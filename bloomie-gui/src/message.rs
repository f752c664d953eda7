//! Application message types for async communication.
//!
//! Messages are sent from background worker threads to the main UI thread
//! via channels to report connection results, session starts and ends, and
//! loaded record files. Live registry snapshots go through `SnapshotSlot`.

use std::path::PathBuf;

use bloomie_core::Registry;
use bloomie_io::{DeviceLayout, RunSummary};

/// Messages sent from background workers to the UI thread.
pub enum AppMessage {
    /// Device discovery succeeded.
    ///
    /// Contains the instrument address and the discovered layout.
    Connected(String, DeviceLayout),

    /// Device discovery or user validation failed.
    ConnectError(String),

    /// Backend prepared and data flowing.
    ///
    /// Contains the experiment name on the instrument, if any.
    SessionStarted(Option<String>),

    /// Recording loop returned normally.
    SessionEnded(RunSummary),

    /// Session could not start, or the loop stopped on an error.
    SessionError(String),

    /// Record file read back for the historical view.
    HistoryLoaded(PathBuf, Box<Registry>),

    /// Record file could not be read.
    HistoryError(String),
}
