//! Top bar with the tab switcher and bottom status bar.

use eframe::egui;

use super::theme::{accent, ThemeColors};
use crate::app::{BloomieApp, Tab};

impl BloomieApp {
    /// Render the top panel with branding and the tab switcher.
    pub(crate) fn render_top_panel(&mut self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("BLOOMIE")
                            .size(14.0)
                            .strong()
                            .color(accent::BLUE),
                    );
                    ui.separator();

                    ui.selectable_value(&mut self.tab, Tab::Setup, "Setup");
                    let enabled = self.measurement_enabled();
                    ui.add_enabled_ui(enabled, |ui| {
                        ui.selectable_value(&mut self.tab, Tab::Measurement, "Measurement")
                            .on_disabled_hover_text("Connect to the devices first");
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.engine.is_frozen() {
                            ui.label(egui::RichText::new("FROZEN").strong().color(accent::AMBER));
                        }
                        if let Some(session) = &self.session {
                            let text = if session.is_stopping() {
                                "STOPPING"
                            } else {
                                "REC"
                            };
                            ui.label(egui::RichText::new(text).strong().color(accent::RED));
                        } else if let Some(path) = &self.history_path {
                            ui.label(
                                egui::RichText::new(format!("History: {}", path.display()))
                                    .color(colors.text_muted),
                            );
                        }
                    });
                });
            });
    }

    /// Render the status bar.
    pub(crate) fn render_bottom_panel(&self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 6.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let dot = if self.processing.is_busy() {
                        accent::AMBER
                    } else if self.session.is_some() {
                        accent::RED
                    } else {
                        accent::GREEN
                    };
                    ui.label(egui::RichText::new("●").color(dot));
                    if self.processing.is_busy() {
                        ui.spinner();
                    }
                    ui.label(
                        egui::RichText::new(&self.processing.status_text)
                            .size(11.0)
                            .color(colors.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let target = match &self.setup.connected_to {
                            Some(addr) => format!("Devices: {addr}"),
                            None => "Not connected".to_string(),
                        };
                        ui.label(
                            egui::RichText::new(target)
                                .size(11.0)
                                .color(colors.text_muted),
                        );
                    });
                });
            });
    }
}
