//! Record file loading for the historical view.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use bloomie_core::Registry;
use bloomie_io::read_record_file;
use eframe::egui;

use crate::message::AppMessage;

/// Read a record file and rebuild its series in a background thread.
pub fn load_history_worker(path: PathBuf, tx: &Sender<AppMessage>, ctx: &egui::Context) {
    let msg = match read_record_file(&path) {
        Ok(rows) => {
            log::info!("Loaded {} row(s) from {}", rows.len(), path.display());
            let registry = Registry::from_rows(&rows);
            AppMessage::HistoryLoaded(path, Box::new(registry))
        }
        Err(e) => AppMessage::HistoryError(format!("{}: {e}", path.display())),
    };
    let _ = tx.send(msg);
    ctx.request_repaint();
}
