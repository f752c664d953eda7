//! Measurement tab: record toggle, annotation, plot controls and the live plot.

use bloomie_io::RECORD_HEADER;
use eframe::egui;
use rfd::FileDialog;

use super::theme::{form_label, record_button, section_header, ThemeColors};
use crate::app::BloomieApp;
use crate::util::to_color32;

/// What the side panel asked for this frame.
#[derive(Default)]
struct Actions {
    toggle_record: bool,
    open_record: bool,
    redraw: bool,
}

impl BloomieApp {
    pub(crate) fn render_measurement_tab(&mut self, ctx: &egui::Context) {
        let mut actions = Actions::default();

        egui::SidePanel::left("measurement_controls")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_record_controls(ui, &mut actions);
                    ui.separator();
                    self.render_annotation(ui);
                    ui.separator();
                    self.render_plot_controls(ui, &mut actions);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| self.render_plot(ui));

        if actions.toggle_record {
            if self.is_recording() {
                self.stop_recording();
            } else {
                self.request_recording(ctx);
            }
        }
        if actions.open_record {
            let start = self.config.default_folder_path();
            if let Some(path) = FileDialog::new()
                .set_directory(start)
                .add_filter("Record", &["tsv", "txt"])
                .pick_file()
            {
                self.open_history(ctx, path);
            }
        }
        if actions.redraw {
            self.redraw();
        }
    }

    fn render_record_controls(&mut self, ui: &mut egui::Ui, actions: &mut Actions) {
        let colors = ThemeColors::from_ui(ui);
        ui.label(section_header("Recording"));

        let recording = self.is_recording();
        let stopping = self.session.as_ref().is_some_and(|s| s.is_stopping());
        let can_toggle = self.setup.layout.is_some() && !self.processing.is_starting && !stopping;
        if ui
            .add_enabled(can_toggle, record_button(recording))
            .clicked()
        {
            actions.toggle_record = true;
        }

        ui.add_enabled_ui(!recording, |ui| {
            ui.label(form_label("Folder"));
            ui.text_edit_singleline(&mut self.setup.folder);
            ui.label(form_label("File name"));
            ui.text_edit_singleline(&mut self.setup.file_name);
        });

        if let Some(session) = &self.session {
            if let Some(experiment) = &session.experiment {
                ui.label(
                    egui::RichText::new(format!("Experiment: {experiment}"))
                        .color(colors.text_muted),
                );
            }
        }

        ui.add_space(4.0);
        let can_open = !recording && !self.processing.is_loading;
        if ui
            .add_enabled(can_open, egui::Button::new("Open record..."))
            .on_hover_text(format!("Columns: {}", RECORD_HEADER.replace('\t', ", ")))
            .clicked()
        {
            actions.open_record = true;
        }
    }

    fn render_annotation(&mut self, ui: &mut egui::Ui) {
        ui.label(section_header("Annotation"));
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.measurement.annotation_draft)
                .hint_text("Stamped on new rows"),
        );
        if response.changed() {
            self.measurement.annotation_dirty = true;
        }
        if response.lost_focus() {
            self.commit_annotation();
        }
        if !self.annotation.is_empty() {
            ui.label(egui::RichText::new(format!("Current: {}", self.annotation)).weak());
        }
    }

    fn render_plot_controls(&mut self, ui: &mut egui::Ui, actions: &mut Actions) {
        ui.label(section_header("Plot"));

        egui::Grid::new("plot_controls")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label(form_label("Max points"));
                let points = ui.text_edit_singleline(&mut self.measurement.max_points);
                ui.end_row();

                ui.label(form_label("Downsample"));
                let downsample = ui.text_edit_singleline(&mut self.measurement.downsample);
                ui.end_row();

                if points.lost_focus() || downsample.lost_focus() {
                    self.measurement.normalize_counts();
                    actions.redraw = true;
                }
            });

        ui.add_space(6.0);
        ui.label(form_label("Highlight keywords"));
        for (keyword, color) in self
            .measurement
            .keywords
            .iter_mut()
            .zip(self.palette.iter().copied())
        {
            ui.horizontal(|ui| {
                let (swatch, _) =
                    ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter().rect_filled(swatch, 2.0, to_color32(color));
                if ui.text_edit_singleline(keyword).lost_focus() {
                    actions.redraw = true;
                }
            });
        }

        ui.add_space(6.0);
        if ui
            .checkbox(&mut self.measurement.log_scale, "Log scale")
            .changed()
        {
            actions.redraw = true;
        }
        if ui
            .checkbox(&mut self.measurement.frozen, "Freeze plot")
            .changed()
        {
            actions.redraw = true;
        }
    }
}
