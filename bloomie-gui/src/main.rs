//! Bloomie GUI application entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod message;
mod pipeline;
mod state;
mod ui;
mod util;

use anyhow::Context as _;
use app::BloomieApp;
use bloomie_io::AppConfig;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (config, _) = AppConfig::load().context("cannot load the configuration")?;
    if config.simulation {
        log::info!("Simulation mode: no instrument will be contacted");
    }

    let app = BloomieApp::new(config)?;
    let antialiasing = app.config.antialiasing;
    let auto_connect = app.config.auto_connect;

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Bloomie")
            .with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Bloomie",
        opts,
        Box::new(move |cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            cc.egui_ctx
                .tessellation_options_mut(|options| options.feathering = antialiasing);
            let mut app = app;
            if auto_connect {
                app.connect(&cc.egui_ctx);
            }
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
