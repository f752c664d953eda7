//! bloomie-io: Instrument access and persistence for bloomie.
//!
//! This crate covers everything that talks to the outside world: the YAML
//! configuration, the instrument's REST control API, WebSocket and
//! simulated reading sources, record files, and the acquisition loop that
//! ties them together.
//!

pub mod acquisition;
pub mod api;
pub mod config;
mod error;
pub mod record;
pub mod source;

pub use acquisition::{
    clear_backend, close_backend, BackendConfig, Recorder, RecorderOptions, RunSummary,
    SessionFlags, SharedAnnotation,
};
pub use api::{ControlApi, DeviceLayout, HttpControlApi, Sample, SampleSpec};
pub use config::AppConfig;
pub use error::{
    AcquisitionError, ApiError, BackendError, ConfigError, DataSourceError, DecodeError, Error,
    RecordError, Result,
};
pub use record::{read_record_file, read_records, FileMode, RecordWriter, RECORD_HEADER};
pub use source::{decode_batch, DataSource, SimulatedSource, WebSocketSource};
