//! Handle on the running recording session.

use std::path::PathBuf;
use std::sync::Arc;

use bloomie_core::Registry;
use bloomie_io::{SessionFlags, SharedAnnotation};
use parking_lot::{Mutex, RwLock};

/// Newest registry snapshot from the worker.
///
/// Holds at most one snapshot: publishing replaces an unread one, and the
/// UI takes whatever is there on its next frame.
#[derive(Clone, Default)]
pub struct SnapshotSlot(Arc<Mutex<Option<Box<Registry>>>>);

impl SnapshotSlot {
    /// Stores a copy of the registry, dropping any unread snapshot.
    pub fn publish(&self, registry: &Registry) {
        *self.0.lock() = Some(Box::new(registry.clone()));
    }

    pub fn take(&self) -> Option<Box<Registry>> {
        self.0.lock().take()
    }
}

/// UI side of a session: the shared flags and annotation plus what the
/// worker reported back.
pub struct SessionHandle {
    pub flags: Arc<SessionFlags>,
    pub annotation: SharedAnnotation,
    pub snapshot: SnapshotSlot,
    pub record_path: PathBuf,
    /// Instrument address; `None` in simulation.
    pub instrument: Option<String>,
    /// Experiment name on the instrument, once started.
    pub experiment: Option<String>,
    /// Backend prepared and the loop running.
    pub started: bool,
}

impl SessionHandle {
    /// New session with the record toggle engaged.
    pub fn new(record_path: PathBuf, instrument: Option<String>, annotation: &str) -> Self {
        let flags = Arc::new(SessionFlags::new());
        flags.set_toggle(true);
        Self {
            flags,
            annotation: Arc::new(RwLock::new(annotation.to_string())),
            snapshot: SnapshotSlot::default(),
            record_path,
            instrument,
            experiment: None,
            started: false,
        }
    }

    /// Releases the record toggle; the loop exits after its current batch.
    pub fn request_stop(&self) {
        self.flags.set_toggle(false);
    }

    pub fn is_stopping(&self) -> bool {
        !self.flags.toggle()
    }

    /// Publishes a new annotation to the worker.
    pub fn set_annotation(&self, text: &str) {
        *self.annotation.write() = text.to_string();
    }
}
