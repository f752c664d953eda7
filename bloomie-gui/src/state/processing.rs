//! Processing state for background operations.

/// Tracks the state of background connect, start and load operations.
pub struct ProcessingState {
    /// Whether device discovery is in progress.
    pub is_connecting: bool,
    /// Whether a session is starting (file, stream, backend).
    pub is_starting: bool,
    /// Whether a record file is being read for the historical view.
    pub is_loading: bool,
    /// User-facing status message.
    pub status_text: String,
}

impl ProcessingState {
    pub fn is_busy(&self) -> bool {
        self.is_connecting || self.is_starting || self.is_loading
    }
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            is_connecting: false,
            is_starting: false,
            is_loading: false,
            status_text: "Ready".to_string(),
        }
    }
}
