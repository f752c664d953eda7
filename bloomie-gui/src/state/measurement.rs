//! Measurement tab controls.

use bloomie_core::{parse_count, HighlightRules, Rgb, ScaleMode, WindowSpec};
use bloomie_io::AppConfig;

/// Plot controls and the annotation field.
pub struct MeasurementState {
    /// Annotation being typed; committed on Enter or focus loss.
    pub annotation_draft: String,
    /// Draft differs from the committed annotation.
    pub annotation_dirty: bool,
    pub downsample: String,
    pub max_points: String,
    /// One keyword per highlight color, in priority order.
    pub keywords: Vec<String>,
    pub log_scale: bool,
    pub frozen: bool,
    max_points_cap: usize,
}

impl MeasurementState {
    pub fn from_config(config: &AppConfig, palette_len: usize) -> Self {
        Self {
            annotation_draft: String::new(),
            annotation_dirty: false,
            downsample: "1".to_string(),
            max_points: config.max_points.to_string(),
            keywords: vec![String::new(); palette_len],
            log_scale: false,
            frozen: false,
            max_points_cap: config.max_points,
        }
    }

    /// Effective window; the point cap never exceeds the configured maximum.
    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(
            parse_count(&self.downsample),
            parse_count(&self.max_points).min(self.max_points_cap),
        )
    }

    /// Rewrites both count fields with the values actually in use.
    pub fn normalize_counts(&mut self) {
        let spec = self.window_spec();
        self.downsample = spec.downsample().to_string();
        self.max_points = spec.max_points().to_string();
    }

    pub fn highlight_rules(&self, palette: &[Rgb]) -> HighlightRules {
        HighlightRules::from_pairs(
            self.keywords
                .iter()
                .map(String::as_str)
                .zip(palette.iter().copied()),
        )
    }

    pub fn scale(&self) -> ScaleMode {
        if self.log_scale {
            ScaleMode::Log
        } else {
            ScaleMode::Linear
        }
    }
}
