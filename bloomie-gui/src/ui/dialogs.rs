//! Modal prompts: existing record file and closing during a session.

use bloomie_io::FileMode;
use eframe::egui;

use super::theme::{accent, primary_button};
use crate::app::BloomieApp;

enum OverwriteChoice {
    Overwrite,
    Append,
    Cancel,
}

impl BloomieApp {
    pub(crate) fn render_overwrite_dialog(&mut self, ctx: &egui::Context) {
        let Some(path) = self.dialogs.overwrite.clone() else {
            return;
        };
        let mut open = true;
        let mut choice = None;

        egui::Window::new("Record file exists")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(format!("{} already exists.", path.display()));
                ui.label("Overwrite it, or append the new readings?");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui
                        .add(egui::Button::new(
                            egui::RichText::new("Overwrite").color(accent::RED),
                        ))
                        .clicked()
                    {
                        choice = Some(OverwriteChoice::Overwrite);
                    }
                    if ui.add(primary_button("Append")).clicked() {
                        choice = Some(OverwriteChoice::Append);
                    }
                    if ui.button("Cancel").clicked() {
                        choice = Some(OverwriteChoice::Cancel);
                    }
                });
            });

        if !open {
            choice = Some(OverwriteChoice::Cancel);
        }
        let Some(choice) = choice else {
            return;
        };
        self.dialogs.overwrite = None;
        match choice {
            OverwriteChoice::Overwrite => self.start_recording(ctx, FileMode::Overwrite),
            OverwriteChoice::Append => self.start_recording(ctx, FileMode::Append),
            OverwriteChoice::Cancel => {
                self.processing.status_text = "Recording cancelled".to_string();
            }
        }
    }

    pub(crate) fn render_close_dialog(&mut self, ctx: &egui::Context) {
        if !self.dialogs.confirm_close {
            return;
        }
        let mut open = true;
        let mut confirmed = false;
        let mut cancelled = false;

        egui::Window::new("Recording in progress")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Closing stops the recording and ends the session on the instrument.");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui
                        .add(egui::Button::new(
                            egui::RichText::new("Stop and close").color(accent::RED),
                        ))
                        .clicked()
                    {
                        confirmed = true;
                    }
                    if ui.button("Keep recording").clicked() {
                        cancelled = true;
                    }
                });
            });

        if confirmed {
            self.dialogs.confirm_close = false;
            self.dialogs.allow_close = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else if cancelled || !open {
            self.dialogs.confirm_close = false;
        }
    }
}
