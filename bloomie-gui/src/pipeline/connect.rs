//! Device discovery worker.

use std::sync::mpsc::Sender;
use std::time::Duration;

use bloomie_io::{ApiError, DeviceLayout, HttpControlApi};
use eframe::egui;

use crate::message::AppMessage;

/// What the connect worker needs from the setup form.
pub struct ConnectRequest {
    /// Instrument address, `host[:port]`.
    pub addr: String,
    pub username: String,
    pub timeout: Duration,
}

/// Discover devices and validate the user in a background thread.
pub fn connect_worker(request: &ConnectRequest, tx: &Sender<AppMessage>, ctx: &egui::Context) {
    log::info!("Connecting to {}", request.addr);
    let msg = match discover(request) {
        Ok(layout) => {
            log::info!(
                "Connected to {}: {} device(s), {} channel(s)",
                request.addr,
                layout.devices.len(),
                layout.channel_count
            );
            AppMessage::Connected(request.addr.clone(), layout)
        }
        Err(e) => {
            log::warn!("Connection to {} failed: {e}", request.addr);
            AppMessage::ConnectError(format!(
                "Failed to connect to the devices at {}: {e}",
                request.addr
            ))
        }
    };
    let _ = tx.send(msg);
    ctx.request_repaint();
}

fn discover(request: &ConnectRequest) -> Result<DeviceLayout, ApiError> {
    let api = HttpControlApi::new(request.addr.as_str(), request.timeout);
    let layout = api.discover()?;
    api.check_user(&request.username)?;
    Ok(layout)
}
