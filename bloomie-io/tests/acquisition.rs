#![allow(clippy::cast_precision_loss, clippy::uninlined_format_args)]
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;

use bloomie_core::{Quarantined, ReactorLayout, Reading, ReadingBatch, Registry};
use bloomie_io::api::{Experiment, ExperimentSpec};
use bloomie_io::{
    clear_backend, close_backend, read_record_file, AcquisitionError, ApiError, BackendConfig,
    BackendError, ControlApi, DataSource, DataSourceError, FileMode, RecordWriter, Recorder,
    RecorderOptions, Sample, SampleSpec, SessionFlags, SharedAnnotation, RECORD_HEADER,
};
use parking_lot::RwLock;
use tempfile::TempDir;

/// Replays prepared batches, then reports a closed stream.
struct ScriptedSource {
    batches: VecDeque<ReadingBatch>,
    /// Clears the toggle while serving this batch number (1-based).
    stop_at: Option<(usize, Arc<SessionFlags>)>,
    served: usize,
}

impl ScriptedSource {
    fn new(batches: Vec<ReadingBatch>) -> Self {
        Self {
            batches: batches.into(),
            stop_at: None,
            served: 0,
        }
    }
}

impl DataSource for ScriptedSource {
    fn next_batch(&mut self, _registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
        self.served += 1;
        if let Some((at, flags)) = &self.stop_at {
            if *at == self.served {
                flags.set_toggle(false);
            }
        }
        self.batches.pop_front().ok_or(DataSourceError::Closed)
    }
}

fn layout() -> ReactorLayout {
    ReactorLayout::with_placeholders(vec!["A".into(), "B".into()], 3).unwrap()
}

fn full_batch(tick: usize) -> ReadingBatch {
    let readings = ["A", "B"]
        .into_iter()
        .flat_map(|device| {
            (0..3).map(move |channel| {
                Reading::simple(
                    format!("2024-05-01T10:{tick:02}:00"),
                    device,
                    channel,
                    0.01 * (tick + 1) as f64,
                )
            })
        })
        .collect();
    ReadingBatch::from_readings(readings)
}

fn make_recorder(
    source: ScriptedSource,
    always_refresh: bool,
) -> (Recorder<ScriptedSource>, Arc<SessionFlags>, SharedAnnotation) {
    let flags = Arc::new(SessionFlags::new());
    flags.set_toggle(true);
    let annotation: SharedAnnotation = Arc::new(RwLock::new(String::new()));
    let mut recorder = Recorder::new(
        source,
        Arc::clone(&flags),
        Arc::clone(&annotation),
        RecorderOptions { always_refresh },
    );
    recorder.initialize(&layout());
    (recorder, flags, annotation)
}

#[test]
fn test_new_file_has_header_and_all_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.tsv");
    let source = ScriptedSource::new((0..4).map(full_batch).collect());
    let (mut recorder, flags, _) = make_recorder(source, false);

    let record = RecordWriter::open(&path, FileMode::Create).unwrap();
    let err = recorder.run(record, |_| {}).unwrap_err();
    assert!(matches!(err, AcquisitionError::Source(DataSourceError::Closed)));
    assert!(!flags.is_running());

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4 * 6 + 1);
    assert_eq!(lines[0], RECORD_HEADER);
    assert_eq!(content.matches(RECORD_HEADER).count(), 1);
    assert!(content.ends_with('\n'));

    let reactor = recorder.registry().channel("B", 2).unwrap();
    assert_eq!(reactor.times().len(), 4);
    assert_eq!(reactor.values().len(), 4);
}

#[test]
fn test_append_adds_rows_without_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.tsv");

    let (mut first, _, _) = make_recorder(ScriptedSource::new(vec![full_batch(0)]), false);
    let _ = first.run(RecordWriter::open(&path, FileMode::Create).unwrap(), |_| {});

    let source = ScriptedSource::new((1..4).map(full_batch).collect());
    let (mut second, _, _) = make_recorder(source, false);
    let _ = second.run(RecordWriter::open(&path, FileMode::Append).unwrap(), |_| {});

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1 + 6 + 3 * 6);
    assert_eq!(content.matches(RECORD_HEADER).count(), 1);
    assert_eq!(read_record_file(&path).unwrap().len(), 24);
}

#[test]
fn test_stop_within_one_batch() {
    let dir = TempDir::new().unwrap();
    let flags = Arc::new(SessionFlags::new());
    flags.set_toggle(true);
    let mut source = ScriptedSource::new((0..10).map(full_batch).collect());
    source.stop_at = Some((3, Arc::clone(&flags)));
    let mut recorder = Recorder::new(
        source,
        Arc::clone(&flags),
        Arc::new(RwLock::new(String::new())),
        RecorderOptions::default(),
    );
    recorder.initialize(&layout());

    let record = RecordWriter::open(dir.path().join("run.tsv"), FileMode::Create).unwrap();
    let summary = recorder.run(record, |_| {}).unwrap();
    // The batch in flight when the toggle cleared is still processed.
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.rows, 18);
    assert!(!flags.is_running());
}

#[test]
fn test_stop_before_loop_starts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.tsv");
    let source = ScriptedSource::new((0..3).map(full_batch).collect());
    let (mut recorder, flags, _) = make_recorder(source, false);
    flags.stop();
    flags.set_toggle(false);

    let summary = recorder
        .run(RecordWriter::open(&path, FileMode::Create).unwrap(), |_| {
            panic!("no batch expected")
        })
        .unwrap();
    assert_eq!(summary.batches, 0);
    assert!(!flags.is_running());
    assert!(read_record_file(&path).unwrap().is_empty());
}

#[test]
fn test_notify_rule() {
    let last_is_a = ReadingBatch::from_readings(vec![
        Reading::simple("2024-05-01T10:00:00", "B", 0, 0.1),
        Reading::simple("2024-05-01T10:00:00", "A", 0, 0.1),
    ]);
    let last_is_b = ReadingBatch::from_readings(vec![
        Reading::simple("2024-05-01T10:00:01", "A", 1, 0.1),
        Reading::simple("2024-05-01T10:00:01", "B", 1, 0.1),
    ]);
    let empty = ReadingBatch::default();
    let batches = vec![last_is_a, last_is_b, empty];

    let dir = TempDir::new().unwrap();
    let (mut recorder, _, _) = make_recorder(ScriptedSource::new(batches.clone()), false);
    let mut seen = Vec::new();
    let record = RecordWriter::open(dir.path().join("a.tsv"), FileMode::Create).unwrap();
    let _ = recorder.run(record, |registry| seen.push(registry.point_count()));
    // Only the batch ending with the last configured device notifies, after its appends.
    assert_eq!(seen, vec![4]);

    let (mut recorder, _, _) = make_recorder(ScriptedSource::new(batches), true);
    let mut count = 0;
    let record = RecordWriter::open(dir.path().join("b.tsv"), FileMode::Create).unwrap();
    let _ = recorder.run(record, |_| count += 1);
    assert_eq!(count, 3);
}

#[test]
fn test_unknown_and_malformed_entries_are_not_written() {
    let mut batch = ReadingBatch::from_readings(vec![
        Reading::simple("2024-05-01T10:00:00", "A", 0, 0.1),
        Reading::simple("2024-05-01T10:00:00", "Z", 0, 0.1),
        Reading::simple("2024-05-01T10:00:00", "B", 7, 0.1),
    ]);
    batch.quarantined.push(Quarantined {
        index: 3,
        reason: "missing field `raw_od`".into(),
    });

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.tsv");
    let (mut recorder, _, annotation) = make_recorder(ScriptedSource::new(vec![batch]), false);
    *annotation.write() = "inoculated".into();
    let _ = recorder.run(RecordWriter::open(&path, FileMode::Create).unwrap(), |_| {});

    let rows = read_record_file(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "DAC0");
    assert_eq!(rows[0].annotation, "inoculated");
    assert_eq!(recorder.registry().point_count(), 1);
}

#[test]
fn test_uninitialized_recorder_refuses_to_run() {
    let dir = TempDir::new().unwrap();
    let flags = Arc::new(SessionFlags::new());
    let mut recorder = Recorder::new(
        ScriptedSource::new(vec![]),
        flags,
        Arc::new(RwLock::new(String::new())),
        RecorderOptions::default(),
    );
    let record = RecordWriter::open(dir.path().join("run.tsv"), FileMode::Create).unwrap();
    assert!(matches!(
        recorder.run(record, |_| {}),
        Err(AcquisitionError::NotInitialized)
    ));
}

/// In-memory instrument that records every call.
#[derive(Default)]
struct FakeApi {
    samples: RefCell<Vec<Sample>>,
    experiments: RefCell<Vec<Experiment>>,
    calls: RefCell<Vec<String>>,
    fail_close: bool,
    fail_remove: bool,
    keep_samples: bool,
}

impl FakeApi {
    fn with_leftovers() -> Self {
        let api = Self::default();
        api.samples.borrow_mut().push(Sample {
            device: "A".into(),
            channel: 1,
            uuid: "old".into(),
            name: "old".into(),
        });
        api.experiments.borrow_mut().push(Experiment {
            name: "stale".into(),
            description: String::new(),
            interval: 30,
        });
        api
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ControlApi for FakeApi {
    fn samples(&self) -> Result<Vec<Sample>, ApiError> {
        Ok(self.samples.borrow().clone())
    }

    fn experiments(&self) -> Result<Vec<Experiment>, ApiError> {
        Ok(self.experiments.borrow().clone())
    }

    fn create_samples(&self, user: &str, samples: &[SampleSpec]) -> Result<(), ApiError> {
        self.calls
            .borrow_mut()
            .push(format!("create_samples {user} {}", samples.len()));
        let mut listed = self.samples.borrow_mut();
        for (i, spec) in samples.iter().enumerate() {
            listed.push(Sample {
                device: spec.device.clone(),
                channel: spec.channel,
                uuid: format!("uuid-{i}"),
                name: spec.name.clone(),
            });
        }
        Ok(())
    }

    fn remove_samples(&self, samples: &[Sample]) -> Result<(), ApiError> {
        self.calls
            .borrow_mut()
            .push(format!("remove_samples {}", samples.len()));
        if self.fail_remove {
            return Err(ApiError::Remote {
                status: 500,
                body: "busy".into(),
            });
        }
        if !self.keep_samples {
            self.samples.borrow_mut().clear();
        }
        Ok(())
    }

    fn create_experiment(&self, user: &str, experiment: &ExperimentSpec) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(format!(
            "create_experiment {user} {} {}",
            experiment.interval,
            experiment.sample_uuids.len()
        ));
        self.experiments.borrow_mut().push(Experiment {
            name: experiment.name.clone(),
            description: experiment.description.clone(),
            interval: experiment.interval,
        });
        Ok(())
    }

    fn start_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(format!("start {name}"));
        Ok(())
    }

    fn stop_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(format!("stop {name}"));
        Ok(())
    }

    fn close_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(format!("close {name}"));
        if self.fail_close {
            return Err(ApiError::Remote {
                status: 404,
                body: "no such acquisition".into(),
            });
        }
        self.experiments.borrow_mut().retain(|e| e.name != name);
        Ok(())
    }
}

fn backend_config() -> BackendConfig {
    BackendConfig {
        experiment_name: "2024-05-01_experiment".into(),
        username: "lab".into(),
        standard_curve: "default".into(),
        interval: 30,
        description: String::new(),
    }
}

#[test]
fn test_start_backend_sequence() {
    let api = FakeApi::with_leftovers();
    let (recorder, _, _) = make_recorder(ScriptedSource::new(vec![]), false);
    let name = recorder.start_backend(&api, &backend_config()).unwrap();
    assert!(name.starts_with("2024-05-01_experiment_"));
    assert!(name["2024-05-01_experiment_".len()..]
        .chars()
        .all(|c| c.is_ascii_digit()));

    assert_eq!(
        api.calls(),
        vec![
            "close stale".to_string(),
            "remove_samples 1".to_string(),
            "create_samples lab 6".to_string(),
            "create_experiment lab 30 6".to_string(),
            format!("start {name}"),
        ]
    );
    let samples = api.samples().unwrap();
    assert_eq!(samples[0].channel, 1);
    assert_eq!(samples[5].channel, 3);
    assert_eq!(samples[5].name, "DBC2");
}

#[test]
fn test_close_failure_during_cleanup_is_not_fatal() {
    let api = FakeApi {
        fail_close: true,
        ..FakeApi::with_leftovers()
    };

    clear_backend(&api).unwrap();
    assert_eq!(api.calls(), vec!["close stale", "remove_samples 1"]);
}

#[test]
fn test_remote_failures_abort_start() {
    let api = FakeApi {
        fail_remove: true,
        ..FakeApi::with_leftovers()
    };
    let (recorder, _, _) = make_recorder(ScriptedSource::new(vec![]), false);
    match recorder.start_backend(&api, &backend_config()) {
        Err(BackendError::Api(ApiError::Remote { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "busy");
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    let api = FakeApi {
        keep_samples: true,
        ..FakeApi::with_leftovers()
    };
    assert!(matches!(
        recorder.start_backend(&api, &backend_config()),
        Err(BackendError::NotCleared { remaining: 1 })
    ));
}

#[test]
fn test_bad_settings_make_no_remote_calls() {
    let api = FakeApi::with_leftovers();
    let (recorder, _, _) = make_recorder(ScriptedSource::new(vec![]), false);
    let config = BackendConfig {
        standard_curve: String::new(),
        ..backend_config()
    };
    assert!(matches!(
        recorder.start_backend(&api, &config),
        Err(BackendError::Config(_))
    ));
    assert!(api.calls().is_empty());
}

#[test]
fn test_close_backend() {
    let api = FakeApi::with_leftovers();
    close_backend(&api).unwrap();
    assert_eq!(api.calls(), vec!["close stale", "remove_samples 1"]);
    assert!(api.samples().unwrap().is_empty());

    let api = FakeApi {
        fail_close: true,
        ..FakeApi::with_leftovers()
    };
    assert!(close_backend(&api).is_err());
}
