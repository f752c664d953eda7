//! Plot scene construction.
//!
//! [`PlotEngine::render`] turns the registry into a [`Scene`]: windowed,
//! highlighted curves with end-of-curve labels and auto-fitted bounds. The
//! scene is plain data; drawing it is left to the GUI.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::color::Rgb;
use crate::error::RenderError;
use crate::highlight::HighlightRules;
use crate::reactor::{ReactorChannel, Registry};
use crate::window::WindowSpec;

/// Y-axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Linear,
    /// Values are plotted as `log10(value)`.
    Log,
}

impl ScaleMode {
    /// Maps a value into plot coordinates.
    pub fn transform(self, value: f64) -> f64 {
        match self {
            ScaleMode::Linear => value,
            ScaleMode::Log => value.log10(),
        }
    }

    pub fn is_log(self) -> bool {
        self == ScaleMode::Log
    }
}

/// Line colors and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    /// Color of reactors no rule matches.
    pub normal_color: Rgb,
    pub normal_width: f32,
    pub highlight_width: f32,
    /// Fraction of the data span added on each side when fitting the view.
    pub padding: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            normal_color: Rgb::LIGHT_GRAY,
            normal_width: 1.0,
            highlight_width: 3.0,
            padding: 0.05,
        }
    }
}

/// Text drawn at the most recent point of a curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// One reactor, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub device: String,
    pub channel: usize,
    pub name: String,
    pub color: Rgb,
    pub width: f32,
    pub highlighted: bool,
    /// `[unix seconds, y]`, most recent first.
    pub points: Vec<[f64; 2]>,
    pub label: Option<CurveLabel>,
}

/// Axis-aligned view range in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Bounds {
    fn around(points: impl Iterator<Item = [f64; 2]>) -> Option<Self> {
        points.fold(None, |acc: Option<Bounds>, [x, y]| {
            Some(match acc {
                None => Bounds {
                    min: [x, y],
                    max: [x, y],
                },
                Some(b) => Bounds {
                    min: [b.min[0].min(x), b.min[1].min(y)],
                    max: [b.max[0].max(x), b.max[1].max(y)],
                },
            })
        })
    }

    /// Grows the range by `fraction` of its span on every side.
    fn padded(self, fraction: f64) -> Self {
        let pad = |lo: f64, hi: f64| {
            let span = if hi > lo { hi - lo } else { 1.0 };
            (lo - span * fraction, hi + span * fraction)
        };
        let (x0, x1) = pad(self.min[0], self.max[0]);
        let (y0, y1) = pad(self.min[1], self.max[1]);
        Bounds {
            min: [x0, y0],
            max: [x1, y1],
        }
    }
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Neutral curves first, then highlighted curves in rule order.
    pub curves: Vec<Curve>,
    pub bounds: Option<Bounds>,
    pub scale: ScaleMode,
    /// Increments with every render so viewers can refit once per scene.
    pub generation: u64,
}

/// Builds and keeps the current scene.
#[derive(Debug, Clone, Default)]
pub struct PlotEngine {
    style: PlotStyle,
    frozen: bool,
    scene: Option<Scene>,
    generation: u64,
}

impl PlotEngine {
    pub fn new(style: PlotStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    /// While frozen, [`render`](Self::render) leaves the scene untouched.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Last rendered scene.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Drops the current scene.
    pub fn clear(&mut self) {
        self.scene = None;
    }

    /// Rebuilds the scene from the registry.
    ///
    /// Returns `false` without touching the scene when frozen or when the
    /// registry holds no data. Curves that fail to build are logged and
    /// skipped.
    pub fn render(
        &mut self,
        registry: &Registry,
        window: WindowSpec,
        rules: &HighlightRules,
        scale: ScaleMode,
    ) -> bool {
        if self.frozen || !registry.has_data() {
            return false;
        }

        let mut neutral = Vec::new();
        let mut highlighted: Vec<Vec<Curve>> = vec![Vec::new(); rules.len()];

        for (device, channel, reactor) in registry.iter() {
            if !reactor.is_active() || reactor.is_empty() {
                continue;
            }
            let rule = rules.match_index(&reactor.name);
            let (color, width) = match rule {
                Some(i) => (rules.rules()[i].color(), self.style.highlight_width),
                None => (self.style.normal_color, self.style.normal_width),
            };

            match build_curve(reactor, window, scale) {
                Ok((points, label)) => {
                    let curve = Curve {
                        device: device.to_string(),
                        channel,
                        name: reactor.name.clone(),
                        color,
                        width,
                        highlighted: rule.is_some(),
                        points,
                        label,
                    };
                    match rule {
                        Some(i) => highlighted[i].push(curve),
                        None => neutral.push(curve),
                    }
                }
                Err(e) => log::warn!("not plotting {:?} ({device}/{channel}): {e}", reactor.name),
            }
        }

        let curves: Vec<Curve> = neutral
            .into_iter()
            .chain(highlighted.into_iter().flatten())
            .collect();

        let bounds = Bounds::around(curves.iter().flat_map(|curve| {
            curve
                .points
                .iter()
                .copied()
                .chain(curve.label.as_ref().map(|l| [l.x, l.y]))
        }))
        .map(|b| b.padded(self.style.padding));

        self.generation += 1;
        self.scene = Some(Scene {
            curves,
            bounds,
            scale,
            generation: self.generation,
        });
        true
    }
}

/// Windowed points and label for one reactor.
fn build_curve(
    reactor: &ReactorChannel,
    window: WindowSpec,
    scale: ScaleMode,
) -> Result<(Vec<[f64; 2]>, Option<CurveLabel>), RenderError> {
    let times = reactor.times();
    let values = reactor.values();

    let mut points = Vec::new();
    let mut latest: Option<(f64, f64)> = None;
    for i in window.indices(values.len()) {
        let x = parse_timestamp(&times[i])?;
        let value = values[i];
        if latest.is_none() {
            latest = Some((x, value));
        }
        let y = scale.transform(value);
        if y.is_finite() {
            points.push([x, y]);
        }
    }

    let (x, value) = latest.ok_or(RenderError::EmptyWindow)?;
    let label = if scale.is_log() && value <= 0.0 {
        None
    } else {
        let y = scale.transform(value);
        y.is_finite().then(|| CurveLabel {
            x,
            y,
            text: reactor.name.clone(),
        })
    };

    Ok((points, label))
}

/// Parses an ISO-8601 timestamp into Unix seconds.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS[.f]`,
/// which is read as local time.
///
/// # Errors
///
/// Returns [`RenderError::BadTimestamp`] for anything else.
#[allow(clippy::cast_precision_loss)]
pub fn parse_timestamp(text: &str) -> Result<f64, RenderError> {
    let text = text.trim();
    let to_secs = |micros: i64| micros as f64 * 1e-6;

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(to_secs(dt.timestamp_micros()));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(to_secs(dt.timestamp_micros()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return Ok(to_secs(local.timestamp_micros()));
            }
        }
    }
    Err(RenderError::BadTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ReactorLayout;
    use crate::reading::Reading;
    use approx::assert_relative_eq;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn stamp(minute: usize) -> String {
        format!("2024-05-01T10:{minute:02}:00+00:00")
    }

    fn registry(names: &[&str], points: usize) -> Registry {
        let mut layout = ReactorLayout::new(vec!["A".into()], names.len()).unwrap();
        for (channel, name) in names.iter().enumerate() {
            *layout.name_mut(0, channel).unwrap() = (*name).to_string();
        }
        let mut registry = Registry::initialize(&layout);
        for minute in 0..points {
            for channel in 0..names.len() {
                #[allow(clippy::cast_precision_loss)]
                let od = 0.1 * (minute + 1) as f64;
                registry
                    .append(&Reading::simple(stamp(minute), "A", channel, od))
                    .unwrap();
            }
        }
        registry
    }

    #[test]
    fn test_empty_registry_is_noop() {
        let mut engine = PlotEngine::default();
        let registry = registry(&["a"], 0);
        assert!(!engine.render(
            &registry,
            WindowSpec::default(),
            &HighlightRules::default(),
            ScaleMode::Linear,
        ));
        assert!(engine.scene().is_none());
    }

    #[test]
    fn test_freeze_keeps_scene() {
        let mut engine = PlotEngine::default();
        let rules = HighlightRules::default();
        assert!(engine.render(
            &registry(&["a"], 3),
            WindowSpec::default(),
            &rules,
            ScaleMode::Linear,
        ));
        let before = engine.scene().cloned();

        engine.set_frozen(true);
        assert!(!engine.render(
            &registry(&["a", "b"], 9),
            WindowSpec::default(),
            &rules,
            ScaleMode::Linear,
        ));
        assert_eq!(engine.scene().cloned(), before);
    }

    #[test]
    fn test_highlight_order_and_weights() {
        let mut engine = PlotEngine::default();
        let rules = HighlightRules::from_pairs([("glu*", RED), ("*ctrl", BLUE)]);
        let registry = registry(&["glucose_ctrl", "plain", "lactose_ctrl", ""], 2);
        engine.render(&registry, WindowSpec::default(), &rules, ScaleMode::Linear);

        let scene = engine.scene().unwrap();
        let names: Vec<&str> = scene.curves.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["plain", "glucose_ctrl", "lactose_ctrl"]);
        assert_eq!(scene.curves[0].color, Rgb::LIGHT_GRAY);
        assert!(!scene.curves[0].highlighted);
        assert_eq!(scene.curves[1].color, RED);
        assert_eq!(scene.curves[2].color, BLUE);
        assert!(scene.curves[1].width > scene.curves[0].width);
    }

    #[test]
    fn test_window_and_label_at_latest_point() {
        let mut engine = PlotEngine::default();
        let registry = registry(&["a"], 20);
        engine.render(
            &registry,
            WindowSpec::new(3, 4),
            &HighlightRules::default(),
            ScaleMode::Linear,
        );

        let curve = &engine.scene().unwrap().curves[0];
        let ys: Vec<f64> = curve.points.iter().map(|p| p[1]).collect();
        assert_eq!(ys.len(), 4);
        assert_relative_eq!(ys[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(ys[3], 1.1, epsilon = 1e-12);

        let label = curve.label.as_ref().unwrap();
        assert_relative_eq!(label.x, curve.points[0][0]);
        assert_relative_eq!(label.y, 2.0, epsilon = 1e-12);
        assert_eq!(label.text, "a");
    }

    #[test]
    fn test_log_scale_nonpositive_latest() {
        let mut layout = ReactorLayout::new(vec!["A".into()], 2).unwrap();
        *layout.name_mut(0, 0).unwrap() = "zero".into();
        *layout.name_mut(0, 1).unwrap() = "fine".into();
        let mut registry = Registry::initialize(&layout);
        for (minute, od) in [0.5, 0.2, 0.0].into_iter().enumerate() {
            registry.append(&Reading::simple(stamp(minute), "A", 0, od)).unwrap();
            registry.append(&Reading::simple(stamp(minute), "A", 1, -od + 1.0)).unwrap();
        }
        registry.append(&Reading::simple(stamp(5), "A", 1, -0.3)).unwrap();

        let mut engine = PlotEngine::default();
        assert!(engine.render(
            &registry,
            WindowSpec::default(),
            &HighlightRules::default(),
            ScaleMode::Log,
        ));
        let scene = engine.scene().unwrap();
        assert_eq!(scene.curves.len(), 2);
        for curve in &scene.curves {
            assert!(curve.label.is_none());
            assert!(curve.points.iter().all(|p| p[1].is_finite()));
        }
        assert_eq!(scene.curves[0].points.len(), 2);
        assert!(scene.bounds.is_some());
    }

    #[test]
    fn test_log_scale_label_position() {
        let mut engine = PlotEngine::default();
        let registry = registry(&["a"], 10);
        engine.render(&registry, WindowSpec::default(), &HighlightRules::default(), ScaleMode::Log);
        let label = engine.scene().unwrap().curves[0].label.clone().unwrap();
        assert_relative_eq!(label.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_timestamp_skips_only_that_curve() {
        let mut layout = ReactorLayout::new(vec!["A".into()], 2).unwrap();
        *layout.name_mut(0, 0).unwrap() = "bad".into();
        *layout.name_mut(0, 1).unwrap() = "good".into();
        let mut registry = Registry::initialize(&layout);
        registry.append(&Reading::simple("yesterday", "A", 0, 0.1)).unwrap();
        registry.append(&Reading::simple(stamp(1), "A", 1, 0.1)).unwrap();

        let mut engine = PlotEngine::default();
        assert!(engine.render(
            &registry,
            WindowSpec::default(),
            &HighlightRules::default(),
            ScaleMode::Linear,
        ));
        let scene = engine.scene().unwrap();
        assert_eq!(scene.curves.len(), 1);
        assert_eq!(scene.curves[0].name, "good");
    }

    #[test]
    fn test_bounds_are_padded() {
        let mut engine = PlotEngine::new(PlotStyle {
            padding: 0.1,
            ..PlotStyle::default()
        });
        let registry = registry(&["a"], 11);
        engine.render(
            &registry,
            WindowSpec::default(),
            &HighlightRules::default(),
            ScaleMode::Linear,
        );
        let bounds = engine.scene().unwrap().bounds.unwrap();
        assert_relative_eq!(bounds.min[1], 0.1 - 0.1, epsilon = 1e-9);
        assert_relative_eq!(bounds.max[1], 1.1 + 0.1, epsilon = 1e-9);
        assert_relative_eq!(bounds.max[0] - bounds.min[0], 600.0 * 1.2, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let utc = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let offset = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_relative_eq!(utc, offset);
        assert_relative_eq!(utc, 1_714_557_600.0);
        assert_relative_eq!(
            parse_timestamp("2024-05-01T10:00:00.500000+0000").unwrap(),
            utc + 0.5,
            epsilon = 1e-6
        );

        let a = parse_timestamp("2024-05-01T10:00:00").unwrap();
        let b = parse_timestamp("2024-05-01T10:00:01.25").unwrap();
        assert_relative_eq!(b - a, 1.25, epsilon = 1e-6);
        assert!(parse_timestamp("01/05/2024").is_err());
    }

    #[test]
    fn test_generation_increments() {
        let mut engine = PlotEngine::default();
        let registry = registry(&["a"], 2);
        let rules = HighlightRules::default();
        engine.render(&registry, WindowSpec::default(), &rules, ScaleMode::Linear);
        engine.render(&registry, WindowSpec::default(), &rules, ScaleMode::Log);
        let scene = engine.scene().unwrap();
        assert_eq!(scene.generation, 2);
        assert_eq!(scene.scale, ScaleMode::Log);
    }
}
