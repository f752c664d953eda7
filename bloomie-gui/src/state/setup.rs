//! Setup tab form state.

use std::path::PathBuf;

use bloomie_core::ReactorLayout;
use bloomie_io::config::expand_home;
use bloomie_io::{AppConfig, BackendConfig};
use chrono::Local;

/// Experiment details, connection target and the reactor name grid.
pub struct SetupState {
    pub address: String,
    pub experiment_name: String,
    /// Recording interval in seconds, as typed.
    pub interval: String,
    pub standard_curve: String,
    pub username: String,
    pub folder: String,
    pub file_name: String,
    /// Name grid; `None` until connected.
    pub layout: Option<ReactorLayout>,
    /// Address the layout was discovered at.
    pub connected_to: Option<String>,
    /// Inline connection note under the form.
    pub note: String,
    /// Spreadsheet block to paste into the grid.
    pub paste_text: String,
    /// Grid cell the paste starts at: (device column, channel row).
    pub paste_origin: (usize, usize),
}

impl SetupState {
    pub fn from_config(config: &AppConfig) -> Self {
        let experiment_name = dated_name(&config.default_experiment_name);
        Self {
            address: config.default_ip_address.clone(),
            file_name: format!("{experiment_name}.tsv"),
            experiment_name,
            interval: config.default_interval.to_string(),
            standard_curve: config.default_standard_curve.clone(),
            username: config.default_username.clone(),
            folder: config.default_folder.clone(),
            layout: None,
            connected_to: None,
            note: String::new(),
            paste_text: String::new(),
            paste_origin: (0, 0),
        }
    }

    /// Keeps the record file name in step with the experiment name.
    pub fn sync_file_name(&mut self) {
        self.file_name = format!("{}.tsv", self.experiment_name.trim());
    }

    /// Full record file path with `~` expanded.
    pub fn record_path(&self) -> PathBuf {
        expand_home(self.folder.trim()).join(expand_home(self.file_name.trim()))
    }

    /// Session parameters from the form.
    ///
    /// # Errors
    ///
    /// Returns a message for a non-numeric or zero interval or any field the
    /// backend would reject.
    pub fn backend_config(&self) -> Result<BackendConfig, String> {
        let interval = self.interval.trim().parse::<u32>().map_err(|_| {
            format!(
                "Recording interval must be a whole number of seconds, got {:?}",
                self.interval
            )
        })?;
        let config = BackendConfig {
            experiment_name: self.experiment_name.trim().to_string(),
            username: self.username.trim().to_string(),
            standard_curve: self.standard_curve.trim().to_string(),
            interval,
            description: String::new(),
        };
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Today's date followed by `suffix`, e.g. `2024-05-01_experiment`.
fn dated_name(suffix: &str) -> String {
    format!("{}{suffix}", Local::now().format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_config() {
        let setup = SetupState::from_config(&AppConfig::default());
        assert!(setup.experiment_name.ends_with("_experiment"));
        assert_eq!(setup.file_name, format!("{}.tsv", setup.experiment_name));
        assert_eq!(setup.interval, "30");
        assert!(setup.backend_config().is_ok());
    }

    #[test]
    fn test_bad_interval_is_rejected() {
        let mut setup = SetupState::from_config(&AppConfig::default());
        for bad in ["", "abc", "-5", "0"] {
            setup.interval = bad.to_string();
            assert!(setup.backend_config().is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_record_path() {
        let mut setup = SetupState::from_config(&AppConfig::default());
        setup.folder = "/data/runs".into();
        setup.experiment_name = "2024-05-01_glucose".into();
        setup.sync_file_name();
        assert_eq!(
            setup.record_path(),
            PathBuf::from("/data/runs/2024-05-01_glucose.tsv")
        );
    }
}
