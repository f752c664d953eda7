//! Recording session worker.
//!
//! Runs one whole session on its own thread: opens the record file,
//! connects the data source, prepares the instrument and then drives the
//! acquisition loop until the session flags say stop.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use bloomie_core::ReactorLayout;
use bloomie_io::{
    BackendConfig, DataSource, FileMode, HttpControlApi, RecordWriter, Recorder, RecorderOptions,
    RunSummary, SessionFlags, SharedAnnotation, SimulatedSource, WebSocketSource,
};
use eframe::egui;

use crate::message::AppMessage;
use crate::state::SnapshotSlot;

/// Everything a session needs, moved into the worker.
pub struct RecordingJob {
    pub layout: ReactorLayout,
    pub backend: BackendConfig,
    pub addr: String,
    pub timeout: Duration,
    /// Simulated batches every `sim_tick` instead of the instrument.
    pub simulation: bool,
    pub sim_tick: Duration,
    pub record_path: PathBuf,
    pub mode: FileMode,
    pub options: RecorderOptions,
    pub flags: Arc<SessionFlags>,
    pub annotation: SharedAnnotation,
    pub snapshot: SnapshotSlot,
}

/// Run a recording session in a background thread.
pub fn recording_worker(job: RecordingJob, tx: &Sender<AppMessage>, ctx: &egui::Context) {
    let flags = Arc::clone(&job.flags);
    let msg = match run_session(job, tx, ctx) {
        Ok(summary) => AppMessage::SessionEnded(summary),
        Err(e) => {
            log::error!("Recording session failed: {e:#}");
            AppMessage::SessionError(format!("{e:#}"))
        }
    };
    // A failed start never reached the loop, so clear the toggle here too.
    flags.stop();
    flags.set_toggle(false);
    let _ = tx.send(msg);
    ctx.request_repaint();
}

fn run_session(
    job: RecordingJob,
    tx: &Sender<AppMessage>,
    ctx: &egui::Context,
) -> anyhow::Result<RunSummary> {
    let record = RecordWriter::open(&job.record_path, job.mode)
        .with_context(|| format!("cannot open {}", job.record_path.display()))?;

    let source: Box<dyn DataSource + Send> = if job.simulation {
        Box::new(SimulatedSource::new(job.sim_tick))
    } else {
        Box::new(WebSocketSource::connect(&job.addr).context("cannot reach the data stream")?)
    };

    let snapshot = job.snapshot;
    let mut recorder = Recorder::new(source, job.flags, job.annotation, job.options);
    recorder.initialize(&job.layout);

    let experiment = if job.simulation {
        None
    } else {
        let api = HttpControlApi::new(job.addr.as_str(), job.timeout);
        let name = recorder
            .start_backend(&api, &job.backend)
            .context("cannot start the backend")?;
        Some(name)
    };
    let _ = tx.send(AppMessage::SessionStarted(experiment));
    ctx.request_repaint();

    let summary = recorder.run(record, |registry| {
        snapshot.publish(registry);
        ctx.request_repaint();
    })?;
    Ok(summary)
}
