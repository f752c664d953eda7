//! Background workers for connecting, recording and loading record files.

mod connect;
mod history;
mod recording;

pub use connect::{connect_worker, ConnectRequest};
pub use history::load_history_worker;
pub use recording::{recording_worker, RecordingJob};
