//! Setup tab: experiment form, device connection and the reactor name grid.

use eframe::egui;
use rfd::FileDialog;

use super::theme::{form_label, primary_button, section_header, ThemeColors};
use crate::app::BloomieApp;
use crate::state::SetupState;

impl BloomieApp {
    pub(crate) fn render_setup_tab(&mut self, ctx: &egui::Context) {
        let locked = self.is_recording();
        let mut connect_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let colors = ThemeColors::from_ui(ui);
                ui.label(section_header("Experiment"));
                ui.add_enabled_ui(!locked, |ui| {
                    render_form(ui, &mut self.setup);
                });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    let can_connect = !locked && !self.processing.is_connecting;
                    if ui
                        .add_enabled(can_connect, primary_button("Connect"))
                        .clicked()
                    {
                        connect_clicked = true;
                    }
                    if self.processing.is_connecting {
                        ui.spinner();
                    }
                    ui.label(egui::RichText::new(&self.setup.note).color(colors.text_muted));
                });

                ui.add_space(12.0);
                ui.separator();
                ui.label(section_header("Reactor names"));
                if self.setup.layout.is_some() {
                    ui.add_enabled_ui(!locked, |ui| render_name_grid(ui, &mut self.setup));
                } else {
                    ui.label(
                        egui::RichText::new("Connect to list the devices and their channels.")
                            .color(colors.text_muted),
                    );
                }
            });
        });

        if connect_clicked {
            self.connect(ctx);
        }
    }
}

fn render_form(ui: &mut egui::Ui, setup: &mut SetupState) {
    egui::Grid::new("setup_form")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui| {
            ui.label(form_label("Device address"));
            ui.text_edit_singleline(&mut setup.address);
            ui.end_row();

            ui.label(form_label("Experiment name"));
            if ui.text_edit_singleline(&mut setup.experiment_name).changed() {
                setup.sync_file_name();
            }
            ui.end_row();

            ui.label(form_label("Interval (s)"));
            ui.text_edit_singleline(&mut setup.interval);
            ui.end_row();

            ui.label(form_label("Standard curve"));
            ui.text_edit_singleline(&mut setup.standard_curve);
            ui.end_row();

            ui.label(form_label("User"));
            ui.text_edit_singleline(&mut setup.username);
            ui.end_row();

            ui.label(form_label("Folder"));
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut setup.folder);
                if ui.button("Browse").clicked() {
                    if let Some(dir) = FileDialog::new().pick_folder() {
                        setup.folder = dir.display().to_string();
                    }
                }
            });
            ui.end_row();

            ui.label(form_label("File name"));
            ui.text_edit_singleline(&mut setup.file_name);
            ui.end_row();
        });
}

fn render_name_grid(ui: &mut egui::Ui, setup: &mut SetupState) {
    let Some(layout) = setup.layout.as_mut() else {
        return;
    };
    let devices = layout.devices().to_vec();
    let channels = layout.channel_count();

    egui::ScrollArea::horizontal().show(ui, |ui| {
        egui::Grid::new("name_grid")
            .striped(true)
            .spacing([6.0, 4.0])
            .show(ui, |ui| {
                ui.label("");
                for device in &devices {
                    ui.label(egui::RichText::new(format!("Device {device}")).strong());
                }
                ui.end_row();

                for channel in 0..channels {
                    ui.label(format!("{}", channel + 1));
                    for device_index in 0..devices.len() {
                        if let Some(name) = layout.name_mut(device_index, channel) {
                            ui.add(egui::TextEdit::singleline(name).desired_width(110.0));
                        }
                    }
                    ui.end_row();
                }
            });
    });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Copy names").clicked() {
            ui.ctx().copy_text(layout.copy_text());
        }
        if ui.button("Clear names").clicked() {
            for device_index in 0..devices.len() {
                for channel in 0..channels {
                    if let Some(name) = layout.name_mut(device_index, channel) {
                        name.clear();
                    }
                }
            }
        }
    });

    ui.add_space(8.0);
    ui.label(form_label("Paste a block (tab separated, one row per channel)"));
    ui.add(
        egui::TextEdit::multiline(&mut setup.paste_text)
            .desired_rows(4)
            .desired_width(f32::INFINITY)
            .font(egui::TextStyle::Monospace),
    );
    ui.horizontal(|ui| {
        let (device_index, channel) = &mut setup.paste_origin;
        ui.label("Start at device");
        ui.add(egui::DragValue::new(device_index).range(0..=devices.len().saturating_sub(1)));
        ui.label("channel");
        // Shown one-based like the grid rows.
        let mut shown = *channel + 1;
        ui.add(egui::DragValue::new(&mut shown).range(1..=channels.max(1)));
        *channel = shown - 1;

        if ui.button("Paste").clicked() {
            let written = layout.paste(&setup.paste_text, *device_index, *channel);
            log::info!("Pasted {written} reactor name(s)");
        }
    });
}
