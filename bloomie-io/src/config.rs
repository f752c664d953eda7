//! Application configuration loaded from YAML.
//!
//! Every field has a default, so a partial file (or none at all) is fine.
//! Unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bloomie_core::{PlotStyle, Rgb};
use serde::{Deserialize, Serialize};

use crate::acquisition::RecorderOptions;
use crate::api::DeviceLayout;
use crate::error::ConfigError;

/// User configuration file name under `~/.config`.
pub const USER_CONFIG_NAME: &str = "bloomie.yaml";
/// Fallback configuration file in the working directory.
pub const LOCAL_CONFIG_NAME: &str = "default_config.yaml";

/// Settings shared by the GUI and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Generate readings locally instead of talking to an instrument.
    pub simulation: bool,
    /// Seconds between simulated batches.
    pub sim_data_rate: f64,
    /// Device labels used instead of discovery in simulation.
    pub sim_devices: Vec<String>,
    /// Channels per simulated device.
    pub sim_channels: usize,
    /// Redraw after every batch instead of after the last device's batch.
    pub always_refresh: bool,
    /// Connect to the default address at start-up.
    pub auto_connect: bool,
    /// HTTP timeout in seconds for instrument calls.
    pub connection_timeout: f64,

    pub default_ip_address: String,
    /// Appended to today's date to form the experiment name.
    pub default_experiment_name: String,
    /// Recording interval in seconds.
    pub default_interval: u32,
    pub default_standard_curve: String,
    pub default_username: String,
    pub default_folder: String,
    /// Fill the setup grid with `D{device}C{channel}` names.
    pub use_placeholder_names: bool,

    /// Default point cap for the plot.
    pub max_points: usize,
    /// Highlight colors, in priority order. One keyword field per color.
    pub highlight_colors: Vec<String>,
    pub normal_color: String,
    pub normal_line_width: f32,
    pub highlight_line_width: f32,
    /// Fraction of the data span added around the fitted view.
    pub padding: f64,
    pub axis_text_color: String,
    /// Plot frame color.
    pub grid_color: String,
    pub antialiasing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: false,
            sim_data_rate: 1.0,
            sim_devices: vec!["1".to_string(), "2".to_string()],
            sim_channels: 8,
            always_refresh: false,
            auto_connect: false,
            connection_timeout: 3.0,
            default_ip_address: "127.0.0.1:8080".to_string(),
            default_experiment_name: "_experiment".to_string(),
            default_interval: 30,
            default_standard_curve: "default".to_string(),
            default_username: "lab".to_string(),
            default_folder: "~/bloomie_data".to_string(),
            use_placeholder_names: true,
            max_points: 1000,
            highlight_colors: ["red", "blue", "green", "orange", "purple"]
                .into_iter()
                .map(String::from)
                .collect(),
            normal_color: "#D3D3D3".to_string(),
            normal_line_width: 1.0,
            highlight_line_width: 3.0,
            padding: 0.05,
            axis_text_color: "#000000".to_string(),
            grid_color: "#808080".to_string(),
            antialiasing: true,
        }
    }
}

impl AppConfig {
    /// Candidate configuration files, in priority order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join(USER_CONFIG_NAME));
        }
        paths.push(PathBuf::from(LOCAL_CONFIG_NAME));
        paths
    }

    /// Loads the first existing file from [`search_paths`](Self::search_paths).
    ///
    /// Returns the defaults and `None` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an existing file cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                let config = Self::load_from(&path)?;
                log::info!("Loaded config from {}", path.display());
                return Ok((config, Some(path)));
            }
        }
        log::info!("No config file found, using defaults");
        Ok((Self::default(), None))
    }

    /// Loads and validates one file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and colors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sim_data_rate.is_finite() || self.sim_data_rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sim_data_rate must be >= 0, got {}",
                self.sim_data_rate
            )));
        }
        if !self.connection_timeout.is_finite() || self.connection_timeout <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "connection_timeout must be > 0, got {}",
                self.connection_timeout
            )));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "padding must be >= 0, got {}",
                self.padding
            )));
        }
        if self.simulation && (self.sim_devices.is_empty() || self.sim_channels == 0) {
            return Err(ConfigError::Invalid(
                "simulation needs at least one device and one channel".to_string(),
            ));
        }
        if self.max_points == 0 {
            return Err(ConfigError::Invalid("max_points must be >= 1".to_string()));
        }
        self.highlight_palette()?;
        self.plot_style()?;
        self.axis_color()?;
        self.frame_color()?;
        Ok(())
    }

    /// Parsed highlight colors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown color.
    pub fn highlight_palette(&self) -> Result<Vec<Rgb>, ConfigError> {
        self.highlight_colors
            .iter()
            .map(|c| parse_color("highlight_colors", c))
            .collect()
    }

    /// Line colors, weights and padding for the plot engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown color.
    pub fn plot_style(&self) -> Result<PlotStyle, ConfigError> {
        Ok(PlotStyle {
            normal_color: parse_color("normal_color", &self.normal_color)?,
            normal_width: self.normal_line_width,
            highlight_width: self.highlight_line_width,
            padding: self.padding,
        })
    }

    /// Axis label color.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown color.
    pub fn axis_color(&self) -> Result<Rgb, ConfigError> {
        parse_color("axis_text_color", &self.axis_text_color)
    }

    /// Plot frame color.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown color.
    pub fn frame_color(&self) -> Result<Rgb, ConfigError> {
        parse_color("grid_color", &self.grid_color)
    }

    /// Options for the acquisition loop.
    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            always_refresh: self.always_refresh,
        }
    }

    /// Devices and channels that stand in for discovery in simulation.
    pub fn simulated_layout(&self) -> DeviceLayout {
        DeviceLayout {
            devices: self.sim_devices.clone(),
            channel_count: self.sim_channels,
        }
    }

    /// Delay between simulated batches.
    pub fn sim_tick(&self) -> Duration {
        Duration::from_secs_f64(self.sim_data_rate.max(0.0))
    }

    /// HTTP timeout for instrument calls.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connection_timeout.max(0.001))
    }

    /// Default record folder with `~` expanded.
    pub fn default_folder_path(&self) -> PathBuf {
        expand_home(&self.default_folder)
    }
}

fn parse_color(field: &str, value: &str) -> Result<Rgb, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{field}: {e}")))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            match home_dir() {
                Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
                None => PathBuf::from(path),
            }
        }
        _ => PathBuf::from(path),
    }
}
