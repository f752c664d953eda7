//! Bloomie command-line interface.
//!
//! Lists devices on an instrument, records headlessly (from the instrument or
//! the simulator) and summarizes record files.

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context as _};
use bloomie_core::{ReactorLayout, ReadingBatch, Registry};
use bloomie_io::{
    close_backend, read_record_file, AppConfig, BackendConfig, DataSource, DataSourceError,
    DeviceLayout, FileMode, HttpControlApi, RecordWriter, Recorder, SessionFlags, SimulatedSource,
    WebSocketSource,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use parking_lot::RwLock;

/// Live optical-density recording for networked bioreactors.
#[derive(Parser)]
#[command(name = "bloomie")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the usual search paths)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the devices and channel count at an instrument address
    Devices {
        /// Instrument address, host[:port]
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Record readings to a file until stopped
    Record {
        /// Instrument address, host[:port]
        #[arg(short, long)]
        address: Option<String>,

        /// Use simulated readings instead of the instrument
        #[arg(long)]
        simulate: bool,

        /// Reactor names: tab-separated grid, one row per channel
        #[arg(long)]
        names: Option<PathBuf>,

        /// Experiment name
        #[arg(short, long)]
        experiment: Option<String>,

        /// Instrument user
        #[arg(short, long)]
        user: Option<String>,

        /// Standard curve applied by the instrument
        #[arg(long)]
        curve: Option<String>,

        /// Recording interval in seconds
        #[arg(short, long)]
        interval: Option<u32>,

        /// Record file (defaults to <folder>/<experiment>.tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing record file
        #[arg(long, conflicts_with = "append")]
        overwrite: bool,

        /// Add to an existing record file
        #[arg(long)]
        append: bool,

        /// Stop after this many batches
        #[arg(long)]
        max_batches: Option<usize>,

        /// Annotation stamped on every row
        #[arg(long, default_value = "")]
        annotation: String,
    },

    /// Per-reactor point count and latest OD of a record file
    Summary {
        /// Record file
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => AppConfig::load().context("cannot load the configuration")?.0,
    };

    match cli.command {
        Commands::Devices { address } => {
            let addr = address.unwrap_or_else(|| config.default_ip_address.clone());
            let api = HttpControlApi::new(addr.as_str(), config.timeout());
            let layout = api
                .discover()
                .with_context(|| format!("Failed to connect to the devices at {addr}"))?;
            println!("Devices at {addr}: {}", layout.devices.join(", "));
            println!("Channels per device: {}", layout.channel_count);
            match api.standard_curves() {
                Ok(curves) => println!("Standard curves: {}", curves.join(", ")),
                Err(e) => log::warn!("Could not list standard curves: {e}"),
            }
        }

        Commands::Record {
            address,
            simulate,
            names,
            experiment,
            user,
            curve,
            interval,
            output,
            overwrite,
            append,
            max_batches,
            annotation,
        } => {
            let experiment_name = experiment.unwrap_or_else(|| {
                format!(
                    "{}{}",
                    Local::now().format("%Y-%m-%d"),
                    config.default_experiment_name
                )
            });
            let job = RecordArgs {
                addr: address.unwrap_or_else(|| config.default_ip_address.clone()),
                simulate: simulate || config.simulation,
                names,
                output: output.unwrap_or_else(|| {
                    config
                        .default_folder_path()
                        .join(format!("{experiment_name}.tsv"))
                }),
                mode: file_mode(overwrite, append),
                max_batches,
                annotation,
                backend: BackendConfig {
                    experiment_name,
                    username: user.unwrap_or_else(|| config.default_username.clone()),
                    standard_curve: curve.unwrap_or_else(|| config.default_standard_curve.clone()),
                    interval: interval.unwrap_or(config.default_interval),
                    description: String::new(),
                },
            };
            record(&config, job)?;
        }

        Commands::Summary { input } => {
            let rows = read_record_file(&input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            let registry = Registry::from_rows(&rows);
            println!("File: {}", input.display());
            println!("Rows: {}", rows.len());
            print!("{}", summary_table(&registry));
        }
    }

    Ok(())
}

/// Options for one headless recording.
struct RecordArgs {
    addr: String,
    simulate: bool,
    names: Option<PathBuf>,
    output: PathBuf,
    mode: FileMode,
    max_batches: Option<usize>,
    annotation: String,
    backend: BackendConfig,
}

fn file_mode(overwrite: bool, append: bool) -> FileMode {
    if overwrite {
        FileMode::Overwrite
    } else if append {
        FileMode::Append
    } else {
        FileMode::Create
    }
}

fn record(config: &AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    args.backend.validate()?;
    if args.output.exists() && args.mode == FileMode::Create {
        bail!(
            "{} exists; pass --overwrite or --append",
            args.output.display()
        );
    }

    let api = HttpControlApi::new(args.addr.as_str(), config.timeout());
    let discovered = if args.simulate {
        config.simulated_layout()
    } else {
        let layout = api
            .discover()
            .with_context(|| format!("Failed to connect to the devices at {}", args.addr))?;
        api.check_user(&args.backend.username)?;
        layout
    };
    let layout = build_layout(&discovered, config.use_placeholder_names, args.names.as_deref())?;

    let record = RecordWriter::open(&args.output, args.mode)
        .with_context(|| format!("cannot open {}", args.output.display()))?;
    let flags = Arc::new(SessionFlags::new());
    flags.set_toggle(true);

    let source: Box<dyn DataSource + Send> = if args.simulate {
        Box::new(SimulatedSource::new(config.sim_tick()))
    } else {
        Box::new(WebSocketSource::connect(&args.addr).context("cannot reach the data stream")?)
    };
    let source = BatchLimit::new(source, args.max_batches, Arc::clone(&flags));

    let annotation = Arc::new(RwLock::new(args.annotation));
    let mut recorder =
        Recorder::new(source, Arc::clone(&flags), annotation, config.recorder_options());
    recorder.initialize(&layout);

    if !args.simulate {
        let experiment = recorder
            .start_backend(&api, &args.backend)
            .context("cannot start the backend")?;
        println!("Started experiment {experiment}");
    }

    let stopper = Arc::clone(&flags);
    thread::spawn(move || {
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_ok() {
            log::info!("Recording stop requested");
            stopper.set_toggle(false);
        }
    });
    println!(
        "Recording to {} (press Enter to stop)",
        args.output.display()
    );

    let result = recorder.run(record, |registry| {
        log::debug!("{} point(s) recorded", registry.point_count());
    });

    if !args.simulate {
        if let Err(e) = close_backend(&api) {
            log::warn!("Could not close the backend session: {e}");
        }
    }

    let summary = result?;
    println!(
        "Recorded {} row(s) in {} batch(es), {} quarantined",
        summary.rows, summary.batches, summary.quarantined
    );
    Ok(())
}

/// Name grid for a discovered layout, optionally filled from a names file.
fn build_layout(
    discovered: &DeviceLayout,
    placeholders: bool,
    names: Option<&Path>,
) -> anyhow::Result<ReactorLayout> {
    let devices = discovered.devices.clone();
    let mut layout = if placeholders {
        ReactorLayout::with_placeholders(devices, discovered.channel_count)?
    } else {
        ReactorLayout::new(devices, discovered.channel_count)?
    };
    if let Some(path) = names {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let written = layout.paste(&text, 0, 0);
        log::info!("Read {written} reactor name(s) from {}", path.display());
    }
    Ok(layout)
}

/// Clears the record toggle once `limit` batches have been served.
struct BatchLimit<S> {
    inner: S,
    limit: Option<usize>,
    served: usize,
    flags: Arc<SessionFlags>,
}

impl<S> BatchLimit<S> {
    fn new(inner: S, limit: Option<usize>, flags: Arc<SessionFlags>) -> Self {
        Self {
            inner,
            limit,
            served: 0,
            flags,
        }
    }
}

impl<S: DataSource> DataSource for BatchLimit<S> {
    fn next_batch(&mut self, registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
        let batch = self.inner.next_batch(registry)?;
        self.served += 1;
        if self.limit.is_some_and(|limit| self.served >= limit) {
            self.flags.set_toggle(false);
        }
        Ok(batch)
    }
}

/// One line per reactor with data: device, channel, name, points, latest OD.
fn summary_table(registry: &Registry) -> String {
    let mut out = format!(
        "{:<8} {:>7}  {:<20} {:>7}  {:>10}\n",
        "Device", "Channel", "Name", "Points", "Latest OD"
    );
    for (device, channel, reactor) in registry.iter() {
        let Some(latest) = reactor.last_value() else {
            continue;
        };
        let _ = writeln!(
            out,
            "{device:<8} {channel:>7}  {:<20} {:>7}  {latest:>10.4}",
            reactor.name,
            reactor.len()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomie_core::Reading;
    use std::io::Write;

    struct Endless;

    impl DataSource for Endless {
        fn next_batch(&mut self, _registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
            Ok(ReadingBatch::default())
        }
    }

    #[test]
    fn test_file_mode_flags() {
        assert_eq!(file_mode(false, false), FileMode::Create);
        assert_eq!(file_mode(true, false), FileMode::Overwrite);
        assert_eq!(file_mode(false, true), FileMode::Append);
    }

    #[test]
    fn test_batch_limit_clears_toggle() {
        let flags = Arc::new(SessionFlags::new());
        flags.set_toggle(true);
        let mut source = BatchLimit::new(Endless, Some(2), Arc::clone(&flags));
        let registry = Registry::default();

        source.next_batch(&registry).unwrap();
        assert!(flags.toggle());
        source.next_batch(&registry).unwrap();
        assert!(!flags.toggle());
    }

    #[test]
    fn test_names_file_fills_grid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "glu_a\tglu_b").unwrap();
        writeln!(file, "ctrl_a\tctrl_b").unwrap();

        let discovered = DeviceLayout {
            devices: vec!["1".into(), "2".into()],
            channel_count: 2,
        };
        let layout = build_layout(&discovered, false, Some(file.path())).unwrap();
        assert_eq!(layout.name(1, 0), Some("glu_b"));
        assert_eq!(layout.name(0, 1), Some("ctrl_a"));
    }

    #[test]
    fn test_summary_skips_empty_reactors() {
        let layout = ReactorLayout::new(vec!["1".into()], 2).unwrap();
        let mut registry = Registry::initialize(&layout);
        registry
            .append(&Reading::simple("2024-05-01T10:00:00", "1", 1, 0.25))
            .unwrap();

        let table = summary_table(&registry);
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains("0.2500"));
    }
}
