//! Application state modules.

mod measurement;
mod processing;
mod session;
mod setup;

pub use measurement::MeasurementState;
pub use processing::ProcessingState;
pub use session::{SessionHandle, SnapshotSlot};
pub use setup::SetupState;
