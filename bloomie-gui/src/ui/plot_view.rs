//! OD plot drawn from the engine's current scene.

use eframe::egui;
use egui_plot::{Line, Plot, PlotBounds, PlotPoint, PlotPoints, Text};

use super::theme::ThemeColors;
use crate::app::BloomieApp;
use crate::util::{format_od_tick, format_time_tick, to_color32};

impl BloomieApp {
    pub(crate) fn render_plot(&mut self, ui: &mut egui::Ui) {
        let Some(scene) = self.engine.scene() else {
            let colors = ThemeColors::from_ui(ui);
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("No readings yet").color(colors.text_muted));
            });
            return;
        };

        let log = scene.scale.is_log();
        // Bounds are applied once per scene so pan and zoom survive until new data.
        let refit = scene.generation != self.applied_generation;
        let generation = scene.generation;

        let visuals = ui.visuals_mut();
        visuals.widgets.noninteractive.fg_stroke.color = to_color32(self.axis_color);
        visuals.widgets.noninteractive.bg_stroke.color = to_color32(self.frame_color);

        Plot::new("od_plot")
            .x_axis_label("Time")
            .y_axis_label(if log { "OD (log)" } else { "OD" })
            .x_axis_formatter(|mark, _range| format_time_tick(mark.value))
            .y_axis_formatter(move |mark, _range| format_od_tick(mark.value, log))
            .label_formatter(move |name, point| {
                let time = format_time_tick(point.x).replace('\n', " ");
                let od = format_od_tick(point.y, log);
                if name.is_empty() {
                    format!("{time}\n{od}")
                } else {
                    format!("{name}\n{time}\n{od}")
                }
            })
            .show_grid([false, true])
            .show(ui, |plot_ui| {
                if refit {
                    if let Some(bounds) = scene.bounds {
                        plot_ui.set_plot_bounds(PlotBounds::from_min_max(bounds.min, bounds.max));
                    }
                }
                for curve in &scene.curves {
                    let color = to_color32(curve.color);
                    plot_ui.line(
                        Line::new(PlotPoints::from(curve.points.clone()))
                            .color(color)
                            .width(curve.width)
                            .name(&curve.name),
                    );
                    if let Some(label) = &curve.label {
                        plot_ui.text(
                            Text::new(
                                PlotPoint::new(label.x, label.y),
                                egui::RichText::new(format!(" {}", label.text)).color(color),
                            )
                            .anchor(egui::Align2::LEFT_CENTER),
                        );
                    }
                }
            });

        self.applied_generation = generation;
    }
}
