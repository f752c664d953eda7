//! bloomie-core: Core types for optical-density monitoring.
//!
//! This crate holds everything that does not touch the outside world:
//! the reactor registry that accumulates per-reactor series, the reading
//! record, most-recent-first windowing, keyword highlighting and the plot
//! engine that turns a registry into a drawable scene.
//!

pub mod color;
pub mod error;
pub mod highlight;
pub mod plot;
pub mod reactor;
pub mod reading;
pub mod window;

pub use color::Rgb;
pub use error::{Error, RenderError, Result};
pub use highlight::{HighlightRule, HighlightRules};
pub use plot::{parse_timestamp, Bounds, Curve, CurveLabel, PlotEngine, PlotStyle, ScaleMode, Scene};
pub use reactor::{ReactorChannel, ReactorLayout, Registry, DEFAULT_GROWTH_RATE, MAX_CHANNELS};
pub use reading::{Quarantined, Reading, ReadingBatch, RecordRow};
pub use window::{parse_count, WindowSpec};
