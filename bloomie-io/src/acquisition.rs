//! Recording sessions: backend preparation and the acquisition loop.
//!
//! A [`Recorder`] owns the [`Registry`] for one session. It pulls batches
//! from a [`DataSource`], appends every valid reading to its reactor and to
//! the record file, and hands the registry to an update callback when a
//! batch is worth redrawing. The loop is the only writer; observers get the
//! registry by reference inside the callback and copy what they need.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bloomie_core::{ReactorLayout, Registry};
use parking_lot::RwLock;

use crate::api::{ControlApi, ExperimentSpec, SampleSpec};
use crate::error::{AcquisitionError, BackendError};
use crate::record::RecordWriter;
use crate::source::DataSource;

/// Live annotation text, written by the UI and read once per batch.
pub type SharedAnnotation = Arc<RwLock<String>>;

/// Stop signals shared between the UI and the worker.
///
/// `running` belongs to the loop; `toggle` mirrors the record button. The
/// loop keeps going only while both are set.
#[derive(Debug, Default)]
pub struct SessionFlags {
    running: AtomicBool,
    toggle: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record toggle.
    pub fn set_toggle(&self, on: bool) {
        self.toggle.store(on, Ordering::SeqCst);
    }

    pub fn toggle(&self) -> bool {
        self.toggle.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the run flag; the loop exits before its next receive.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// True while the loop should keep receiving.
    pub fn should_continue(&self) -> bool {
        self.is_running() && self.toggle()
    }

    fn begin(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

/// Loop tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Notify after every batch, not only after the last device's batch.
    pub always_refresh: bool,
}

/// Parameters of the remote recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub experiment_name: String,
    pub username: String,
    pub standard_curve: String,
    /// Seconds between measurements.
    pub interval: u32,
    pub description: String,
}

impl BackendConfig {
    /// Rejects settings the instrument would refuse.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.experiment_name.trim().is_empty() {
            return Err(BackendError::Config("experiment name is empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(BackendError::Config("username is empty".to_string()));
        }
        if self.standard_curve.trim().is_empty() {
            return Err(BackendError::Config("standard curve is empty".to_string()));
        }
        if self.interval == 0 {
            return Err(BackendError::Config(
                "recording interval must be at least 1 s".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    /// Record rows written.
    pub rows: usize,
    /// Entries set aside as malformed or unknown.
    pub quarantined: usize,
    /// Update callbacks fired.
    pub notifications: usize,
}

/// Acquisition loop for one session.
pub struct Recorder<S> {
    source: S,
    registry: Registry,
    flags: Arc<SessionFlags>,
    annotation: SharedAnnotation,
    options: RecorderOptions,
}

impl<S: DataSource> Recorder<S> {
    pub fn new(
        source: S,
        flags: Arc<SessionFlags>,
        annotation: SharedAnnotation,
        options: RecorderOptions,
    ) -> Self {
        Self {
            source,
            registry: Registry::default(),
            flags,
            annotation,
            options,
        }
    }

    /// Rebuilds the registry from the setup grid. Call before each session.
    pub fn initialize(&mut self, layout: &ReactorLayout) {
        self.registry = Registry::initialize(layout);
        log::debug!(
            "Initialized {} reactor(s)",
            self.registry.iter().filter(|(_, _, r)| r.is_active()).count()
        );
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Prepares the instrument: clears it, creates one sample per reactor
    /// slot, then creates and starts the experiment.
    ///
    /// Returns the experiment name used on the instrument.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] for bad settings, a failed remote call, or
    /// samples that survive cleanup.
    pub fn start_backend<A: ControlApi + ?Sized>(
        &self,
        api: &A,
        config: &BackendConfig,
    ) -> Result<String, BackendError> {
        config.validate()?;
        if self.registry.is_empty() {
            return Err(BackendError::Config("no reactors configured".to_string()));
        }

        clear_backend(api)?;
        let remaining = api.samples()?.len();
        if remaining > 0 {
            return Err(BackendError::NotCleared { remaining });
        }

        let specs: Vec<SampleSpec> = self
            .registry
            .iter()
            .map(|(device, channel, reactor)| SampleSpec {
                device: device.to_string(),
                channel: u32::try_from(channel + 1).unwrap_or(u32::MAX),
                name: reactor.name.clone(),
                standard_curve_name: config.standard_curve.clone(),
                metadata: BTreeMap::new(),
            })
            .collect();
        log::info!("Creating {} sample(s)", specs.len());
        api.create_samples(&config.username, &specs)?;

        let name = format!("{}_{}", config.experiment_name, unix_seconds());
        let experiment = ExperimentSpec {
            name: name.clone(),
            description: config.description.clone(),
            interval: config.interval,
            sample_uuids: api.samples()?.into_iter().map(|s| s.uuid).collect(),
        };
        api.create_experiment(&config.username, &experiment)?;

        log::info!("Starting experiment {name} ({} s interval)", config.interval);
        api.start_experiment(&name)?;
        Ok(name)
    }

    /// Runs until the flags say stop or the source fails.
    ///
    /// The record file is dropped, and so closed, on every exit path.
    /// `on_update` runs on this thread after the appends it reports.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError`] if the registry is empty, the source
    /// fails, or a row cannot be written. Rows written so far stay on disk.
    pub fn run<F>(
        &mut self,
        mut record: RecordWriter,
        mut on_update: F,
    ) -> Result<RunSummary, AcquisitionError>
    where
        F: FnMut(&Registry),
    {
        if self.registry.is_empty() {
            return Err(AcquisitionError::NotInitialized);
        }

        if !self.flags.toggle() {
            log::info!("Recording stopped before the first batch");
            return Ok(RunSummary::default());
        }

        log::info!("Recording to {}", record.path().display());
        self.flags.begin();
        let mut summary = RunSummary::default();
        let result = self.poll(&mut record, &mut on_update, &mut summary);
        self.flags.stop();
        drop(record);

        log::info!(
            "Recording stopped after {} batch(es), {} row(s), {} quarantined",
            summary.batches,
            summary.rows,
            summary.quarantined
        );
        result.map(|()| summary)
    }

    fn poll<F>(
        &mut self,
        record: &mut RecordWriter,
        on_update: &mut F,
        summary: &mut RunSummary,
    ) -> Result<(), AcquisitionError>
    where
        F: FnMut(&Registry),
    {
        while self.flags.should_continue() {
            let batch = self.source.next_batch(&self.registry)?;
            summary.batches += 1;
            let annotation = self.annotation.read().clone();

            for entry in &batch.quarantined {
                log::warn!("Quarantined entry {}: {}", entry.index, entry.reason);
            }
            summary.quarantined += batch.quarantined.len();

            let mut last_device = None;
            for reading in &batch.readings {
                match self.registry.append(reading) {
                    Ok(reactor) => {
                        record.write_row(reading, &reactor.name, &annotation)?;
                        summary.rows += 1;
                        last_device = Some(reading.device.as_str());
                    }
                    Err(e) => {
                        log::warn!("Quarantined reading: {e}");
                        summary.quarantined += 1;
                    }
                }
            }

            let notify = self.options.always_refresh
                || (last_device.is_some() && last_device == self.registry.last_device());
            if notify {
                on_update(&self.registry);
                summary.notifications += 1;
            }
        }
        Ok(())
    }
}

/// Closes every listed experiment and removes every sample.
///
/// A failed close is logged and skipped.
///
/// # Errors
///
/// Returns [`BackendError::Api`] if listing or sample removal fails.
pub fn clear_backend<A: ControlApi + ?Sized>(api: &A) -> Result<(), BackendError> {
    let experiments = api.experiments()?;
    if !experiments.is_empty() {
        log::warn!(
            "The instrument already lists {} experiment(s); restart it if this persists",
            experiments.len()
        );
    }
    for experiment in &experiments {
        if let Err(e) = api.close_experiment(&experiment.name) {
            log::warn!("Could not close experiment {}: {e}", experiment.name);
        }
    }

    let samples = api.samples()?;
    if !samples.is_empty() {
        log::info!("Removing {} sample(s)", samples.len());
        api.remove_samples(&samples)?;
    }
    Ok(())
}

/// Closing sequence when the application exits during a session.
///
/// # Errors
///
/// Returns [`BackendError::Api`] on the first failed remote call.
pub fn close_backend<A: ControlApi + ?Sized>(api: &A) -> Result<(), BackendError> {
    for experiment in api.experiments()? {
        log::info!("Closing experiment {}", experiment.name);
        api.close_experiment(&experiment.name)?;
    }
    let samples = api.samples()?;
    if !samples.is_empty() {
        api.remove_samples(&samples)?;
    }
    Ok(())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = SessionFlags::new();
        assert!(!flags.should_continue());
        flags.set_toggle(true);
        assert!(!flags.should_continue());
        flags.begin();
        assert!(flags.should_continue());
        flags.set_toggle(false);
        assert!(!flags.should_continue());
        assert!(flags.is_running());
        flags.stop();
        assert!(!flags.is_running());
    }

    #[test]
    fn test_backend_config_validation() {
        let config = BackendConfig {
            experiment_name: "2024-05-01_experiment".into(),
            username: "lab".into(),
            standard_curve: "default".into(),
            interval: 30,
            description: String::new(),
        };
        config.validate().unwrap();

        let bad = BackendConfig {
            interval: 0,
            ..config.clone()
        };
        assert!(matches!(bad.validate(), Err(BackendError::Config(_))));
        let bad = BackendConfig {
            username: " ".into(),
            ..config
        };
        assert!(bad.validate().is_err());
    }
}
