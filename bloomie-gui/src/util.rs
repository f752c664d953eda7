//! Conversion and formatting helpers for the plot view.

use bloomie_core::Rgb;
use chrono::{Local, TimeZone};
use eframe::egui::Color32;

/// Convert a configured color for drawing.
pub fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

/// Format a unix-seconds axis value as local wall-clock time.
///
/// Returns an empty string for values outside the representable range.
#[allow(clippy::cast_possible_truncation)]
pub fn format_time_tick(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }
    match Local.timestamp_opt(seconds.floor() as i64, 0).single() {
        Some(dt) => dt.format("%H:%M\n%m-%d").to_string(),
        None => String::new(),
    }
}

/// Format a y-axis value; on the log scale the axis holds `log10(od)`.
pub fn format_od_tick(value: f64, log: bool) -> String {
    if log {
        format!("{:.3}", 10f64.powf(value))
    } else {
        format!("{value:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion() {
        assert_eq!(to_color32(Rgb::new(1, 2, 3)), Color32::from_rgb(1, 2, 3));
    }

    #[test]
    fn test_od_ticks() {
        assert_eq!(format_od_tick(0.25, false), "0.250");
        assert_eq!(format_od_tick(-1.0, true), "0.100");
    }

    #[test]
    fn test_time_tick_rejects_nan() {
        assert!(format_time_tick(f64::NAN).is_empty());
        assert!(format_time_tick(1_700_000_000.0).contains(':'));
    }
}
