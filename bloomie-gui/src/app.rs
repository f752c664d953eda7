//! Main application state and logic.
//!
//! Contains the `BloomieApp` struct which owns the configuration, the setup
//! form, the latest registry snapshot, the plot engine and the handle on
//! the running session, and dispatches messages from background workers.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use bloomie_core::{PlotEngine, ReactorLayout, Registry, Rgb};
use bloomie_io::{close_backend, AppConfig, ControlApi, DeviceLayout, FileMode, HttpControlApi};
use eframe::egui;

use crate::message::AppMessage;
use crate::pipeline::{
    connect_worker, load_history_worker, recording_worker, ConnectRequest, RecordingJob,
};
use crate::state::{MeasurementState, ProcessingState, SessionHandle, SetupState};

/// Top-level tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Setup,
    Measurement,
}

/// Modal dialog state.
#[derive(Default)]
pub struct DialogState {
    /// Record file that already exists; asks overwrite / append / cancel.
    pub overwrite: Option<PathBuf>,
    /// Window close requested while recording.
    pub confirm_close: bool,
    /// Close confirmed; the next close request goes through.
    pub allow_close: bool,
}

/// Main application state.
pub struct BloomieApp {
    pub(crate) config: AppConfig,
    /// Highlight colors, one per keyword field.
    pub(crate) palette: Vec<Rgb>,
    pub(crate) axis_color: Rgb,
    pub(crate) frame_color: Rgb,

    pub(crate) tab: Tab,
    pub(crate) setup: SetupState,
    pub(crate) measurement: MeasurementState,
    pub(crate) processing: ProcessingState,
    pub(crate) dialogs: DialogState,

    /// Committed annotation, stamped on every new row.
    pub(crate) annotation: String,
    pub(crate) session: Option<SessionHandle>,
    /// Instrument whose backend a session started and nothing has closed yet.
    pub(crate) backend_addr: Option<String>,

    /// Latest snapshot from the worker, or a loaded record file.
    pub(crate) registry: Option<Registry>,
    /// Record file shown in the historical view.
    pub(crate) history_path: Option<PathBuf>,
    pub(crate) engine: PlotEngine,
    /// Scene generation whose bounds were last applied to the plot.
    pub(crate) applied_generation: u64,

    /// Message receiver for async operations.
    pub(crate) rx: Receiver<AppMessage>,
    /// Message sender for async operations.
    pub(crate) tx: Sender<AppMessage>,
}

impl BloomieApp {
    /// Build the application from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured color does not parse.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let (tx, rx) = channel();
        let palette = config.highlight_palette()?;
        Ok(Self {
            axis_color: config.axis_color()?,
            frame_color: config.frame_color()?,
            engine: PlotEngine::new(config.plot_style()?),
            tab: Tab::Setup,
            setup: SetupState::from_config(&config),
            measurement: MeasurementState::from_config(&config, palette.len()),
            processing: ProcessingState::default(),
            dialogs: DialogState::default(),
            annotation: String::new(),
            session: None,
            backend_addr: None,
            registry: None,
            history_path: None,
            applied_generation: 0,
            palette,
            config,
            rx,
            tx,
        })
    }

    /// Whether a session is starting, running or stopping.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the measurement tab has anything to show.
    pub fn measurement_enabled(&self) -> bool {
        self.setup.layout.is_some() || self.history_path.is_some()
    }

    /// Discover devices at the address in the setup form.
    pub fn connect(&mut self, ctx: &egui::Context) {
        if self.is_recording() || self.processing.is_connecting {
            return;
        }
        self.setup.sync_file_name();

        if self.config.simulation {
            let layout = self.config.simulated_layout();
            self.apply_layout("simulation", &layout);
            return;
        }

        let request = ConnectRequest {
            addr: self.setup.address.trim().to_string(),
            username: self.setup.username.trim().to_string(),
            timeout: self.config.timeout(),
        };
        self.processing.is_connecting = true;
        self.setup.note = format!("Connecting to {}.", request.addr);

        let tx = self.tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || connect_worker(&request, &tx, &ctx));
    }

    /// Rebuild the name grid for a freshly discovered layout.
    fn apply_layout(&mut self, addr: &str, discovered: &DeviceLayout) {
        let devices = discovered.devices.clone();
        let layout = if self.config.use_placeholder_names {
            ReactorLayout::with_placeholders(devices, discovered.channel_count)
        } else {
            ReactorLayout::new(devices, discovered.channel_count)
        };
        match layout {
            Ok(layout) => {
                self.setup.layout = Some(layout);
                self.setup.connected_to = Some(addr.to_string());
                self.setup.note = format!("Connected to {addr}.");
            }
            Err(e) => self.disconnect(format!("Failed to connect to the devices at {addr}: {e}")),
        }
    }

    fn disconnect(&mut self, note: String) {
        self.setup.layout = None;
        self.setup.connected_to = None;
        self.setup.note = note;
        if self.history_path.is_none() {
            self.tab = Tab::Setup;
        }
    }

    /// Record button pressed: check the form, then ask about an existing file.
    pub fn request_recording(&mut self, ctx: &egui::Context) {
        if self.is_recording() || self.setup.layout.is_none() {
            return;
        }
        if let Err(e) = self.setup.backend_config() {
            self.processing.status_text = format!("Error: {e}");
            return;
        }
        let path = self.setup.record_path();
        if path.exists() {
            self.dialogs.overwrite = Some(path);
        } else {
            self.start_recording(ctx, FileMode::Create);
        }
    }

    /// Start a session writing with the given file mode.
    pub fn start_recording(&mut self, ctx: &egui::Context, mode: FileMode) {
        let Some(layout) = self.setup.layout.clone() else {
            return;
        };
        let backend = match self.setup.backend_config() {
            Ok(backend) => backend,
            Err(e) => {
                self.processing.status_text = format!("Error: {e}");
                return;
            }
        };

        let record_path = self.setup.record_path();
        let addr = self
            .setup
            .connected_to
            .clone()
            .unwrap_or_else(|| self.setup.address.trim().to_string());
        let instrument = (!self.config.simulation).then(|| addr.clone());
        let session = SessionHandle::new(record_path.clone(), instrument, &self.annotation);
        let job = RecordingJob {
            layout,
            backend,
            addr,
            timeout: self.config.timeout(),
            simulation: self.config.simulation,
            sim_tick: self.config.sim_tick(),
            record_path: record_path.clone(),
            mode,
            options: self.config.recorder_options(),
            flags: std::sync::Arc::clone(&session.flags),
            annotation: std::sync::Arc::clone(&session.annotation),
            snapshot: session.snapshot.clone(),
        };

        log::info!("Starting recording session ({mode:?}) to {}", record_path.display());
        self.session = Some(session);
        self.processing.is_starting = true;
        self.processing.status_text = "Starting the backend...".to_string();
        self.history_path = None;
        self.registry = None;
        self.engine.clear();
        self.tab = Tab::Measurement;

        let tx = self.tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || recording_worker(job, &tx, &ctx));
    }

    /// Record button released.
    pub fn stop_recording(&mut self) {
        if let Some(session) = &self.session {
            session.request_stop();
            self.processing.status_text = "Stopping after the current batch...".to_string();
            log::info!("Recording stop requested");
        }
    }

    /// Publish the annotation draft.
    pub fn commit_annotation(&mut self) {
        if !self.measurement.annotation_dirty {
            return;
        }
        self.annotation = self.measurement.annotation_draft.trim().to_string();
        self.measurement.annotation_dirty = false;
        log::info!("Annotation changed to {:?}", self.annotation);
        if let Some(session) = &self.session {
            session.set_annotation(&self.annotation);
        }
    }

    /// Read a record file for the historical view.
    pub fn open_history(&mut self, ctx: &egui::Context, path: PathBuf) {
        if self.is_recording() || self.processing.is_loading {
            return;
        }
        self.processing.is_loading = true;
        self.processing.status_text = format!("Loading {}...", path.display());

        let tx = self.tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || load_history_worker(path, &tx, &ctx));
    }

    /// Rebuild the plot scene from the current snapshot.
    pub fn redraw(&mut self) {
        self.engine.set_frozen(self.measurement.frozen);
        let Some(registry) = &self.registry else {
            return;
        };
        let rules = self.measurement.highlight_rules(&self.palette);
        self.engine.render(
            registry,
            self.measurement.window_spec(),
            &rules,
            self.measurement.scale(),
        );
    }

    /// Show the newest snapshot the session published, if any.
    fn pull_snapshot(&mut self) {
        let Some(registry) = self.session.as_ref().and_then(|s| s.snapshot.take()) else {
            return;
        };
        self.registry = Some(*registry);
        self.redraw();
    }

    /// Handle pending messages from async workers.
    pub fn handle_messages(&mut self) {
        self.pull_snapshot();
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                AppMessage::Connected(addr, layout) => {
                    self.processing.is_connecting = false;
                    self.apply_layout(&addr, &layout);
                }
                AppMessage::ConnectError(e) => {
                    self.processing.is_connecting = false;
                    self.disconnect(e);
                }
                AppMessage::SessionStarted(experiment) => {
                    self.processing.is_starting = false;
                    if let Some(session) = &mut self.session {
                        session.started = true;
                        if experiment.is_some() {
                            self.backend_addr.clone_from(&session.instrument);
                        }
                        session.experiment = experiment;
                        self.processing.status_text =
                            format!("Recording to {}", session.record_path.display());
                    }
                }
                AppMessage::SessionEnded(summary) => {
                    self.pull_snapshot();
                    self.processing.is_starting = false;
                    self.session = None;
                    self.processing.status_text = format!(
                        "Recording stopped: {} row(s) in {} batch(es), {} quarantined",
                        summary.rows, summary.batches, summary.quarantined
                    );
                }
                AppMessage::SessionError(e) => {
                    self.pull_snapshot();
                    self.processing.is_starting = false;
                    self.session = None;
                    self.processing.status_text = format!("Error: {e}");
                }
                AppMessage::HistoryLoaded(path, registry) => {
                    self.processing.is_loading = false;
                    self.processing.status_text = format!(
                        "Showing {} ({} point(s))",
                        path.display(),
                        registry.point_count()
                    );
                    self.history_path = Some(path);
                    self.registry = Some(*registry);
                    self.engine.clear();
                    self.redraw();
                    self.tab = Tab::Measurement;
                }
                AppMessage::HistoryError(e) => {
                    self.processing.is_loading = false;
                    self.processing.status_text = format!("Error: {e}");
                }
            }
        }
    }

    /// Ask before closing while recording; run the closing sequence once confirmed.
    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.is_recording() && !self.dialogs.allow_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.dialogs.confirm_close = true;
            return;
        }
        self.shutdown_session();
    }

    /// Stop the loop and close the remote session on the instrument.
    pub(crate) fn shutdown_session(&mut self) {
        let Some(addr) = self.end_session() else {
            return;
        };
        let api = HttpControlApi::new(addr.as_str(), self.config.timeout());
        close_instrument(&api);
    }

    /// Stops any running loop and hands back the instrument still to close.
    ///
    /// The instrument is returned even when the session already ended, so
    /// closing after a stopped recording still ends the remote experiment.
    fn end_session(&mut self) -> Option<String> {
        if let Some(session) = self.session.take() {
            session.flags.stop();
            session.request_stop();
        }
        self.backend_addr.take()
    }
}

fn close_instrument<A: ControlApi + ?Sized>(api: &A) {
    match close_backend(api) {
        Ok(()) => log::info!("Closed the backend session"),
        Err(e) => log::warn!("Could not close the backend session: {e}"),
    }
}

impl eframe::App for BloomieApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_messages();
        self.handle_close_request(ctx);

        self.render_top_panel(ctx);
        self.render_bottom_panel(ctx);
        match self.tab {
            Tab::Setup => self.render_setup_tab(ctx),
            Tab::Measurement => self.render_measurement_tab(ctx),
        }
        self.render_overwrite_dialog(ctx);
        self.render_close_dialog(ctx);

        if self.processing.is_busy() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use bloomie_io::api::{Experiment, ExperimentSpec};
    use bloomie_io::{ApiError, RunSummary, Sample, SampleSpec};

    /// Instrument with one running experiment and one sample.
    struct FakeApi {
        experiments: RefCell<Vec<Experiment>>,
        samples: RefCell<Vec<Sample>>,
    }

    impl FakeApi {
        fn running() -> Self {
            Self {
                experiments: RefCell::new(vec![Experiment {
                    name: "2024-05-01_experiment".into(),
                    description: String::new(),
                    interval: 30,
                }]),
                samples: RefCell::new(vec![Sample {
                    device: "1".into(),
                    channel: 1,
                    uuid: "uuid-0".into(),
                    name: "glucose".into(),
                }]),
            }
        }
    }

    impl ControlApi for FakeApi {
        fn samples(&self) -> Result<Vec<Sample>, ApiError> {
            Ok(self.samples.borrow().clone())
        }

        fn experiments(&self) -> Result<Vec<Experiment>, ApiError> {
            Ok(self.experiments.borrow().clone())
        }

        fn create_samples(&self, _user: &str, _samples: &[SampleSpec]) -> Result<(), ApiError> {
            Ok(())
        }

        fn remove_samples(&self, samples: &[Sample]) -> Result<(), ApiError> {
            self.samples
                .borrow_mut()
                .retain(|s| samples.iter().all(|r| r.uuid != s.uuid));
            Ok(())
        }

        fn create_experiment(&self, _user: &str, _spec: &ExperimentSpec) -> Result<(), ApiError> {
            Ok(())
        }

        fn start_experiment(&self, _name: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn stop_experiment(&self, _name: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn close_experiment(&self, name: &str) -> Result<(), ApiError> {
            self.experiments.borrow_mut().retain(|e| e.name != name);
            Ok(())
        }
    }

    fn app_with_session(simulation: bool) -> BloomieApp {
        let config = AppConfig {
            simulation,
            ..AppConfig::default()
        };
        let mut app = BloomieApp::new(config).unwrap();
        let instrument = (!simulation).then(|| "10.0.0.5:8080".to_string());
        app.session = Some(SessionHandle::new("run.tsv".into(), instrument, ""));
        app
    }

    #[test]
    fn test_close_after_stopped_session_still_closes_backend() {
        let mut app = app_with_session(false);
        let experiment = Some("2024-05-01_experiment".to_string());
        app.tx.send(AppMessage::SessionStarted(experiment)).unwrap();
        app.tx
            .send(AppMessage::SessionEnded(RunSummary::default()))
            .unwrap();
        app.handle_messages();
        assert!(!app.is_recording());

        let addr = app.end_session();
        assert_eq!(addr.as_deref(), Some("10.0.0.5:8080"));

        let api = FakeApi::running();
        close_instrument(&api);
        assert!(api.experiments.borrow().is_empty());
        assert!(api.samples.borrow().is_empty());

        assert!(app.end_session().is_none());
    }

    #[test]
    fn test_close_during_session_stops_loop() {
        let mut app = app_with_session(false);
        app.tx
            .send(AppMessage::SessionStarted(Some("exp".into())))
            .unwrap();
        app.handle_messages();
        let flags = std::sync::Arc::clone(&app.session.as_ref().unwrap().flags);
        flags.set_toggle(true);

        assert_eq!(app.end_session().as_deref(), Some("10.0.0.5:8080"));
        assert!(!flags.toggle());
        assert!(!flags.is_running());
        assert!(app.session.is_none());
    }

    #[test]
    fn test_simulation_and_unstarted_sessions_leave_instrument_alone() {
        let mut app = app_with_session(true);
        app.tx.send(AppMessage::SessionStarted(None)).unwrap();
        app.handle_messages();
        assert!(app.end_session().is_none());

        let mut app = app_with_session(false);
        app.tx
            .send(AppMessage::SessionError("cannot reach the data stream".into()))
            .unwrap();
        app.handle_messages();
        assert!(app.end_session().is_none());
    }

    #[test]
    fn test_published_snapshot_reaches_plot_registry() {
        use bloomie_core::Reading;

        let mut app = app_with_session(true);
        let layout = ReactorLayout::new(vec!["1".into()], 1).unwrap();
        let mut registry = Registry::initialize(&layout);
        registry
            .append(&Reading::simple("2024-05-01T10:00:00", "1", 0, 0.2))
            .unwrap();
        let slot = app.session.as_ref().unwrap().snapshot.clone();
        slot.publish(&registry);
        registry
            .append(&Reading::simple("2024-05-01T10:01:00", "1", 0, 0.3))
            .unwrap();
        slot.publish(&registry);

        app.handle_messages();
        assert_eq!(app.registry.as_ref().unwrap().point_count(), 2);
        assert!(slot.take().is_none());
    }
}
