//! Instrument control API.
//!
//! The instrument exposes REST endpoints for samples (one per device ×
//! channel) and acquisitions ("experiments") that record a set of samples at
//! a fixed interval. [`ControlApi`] is the seam the acquisition loop uses;
//! [`HttpControlApi`] talks to a real instrument.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

/// Sample as listed by the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "string_or_number")]
    pub device: String,
    /// One-based channel.
    pub channel: u32,
    pub uuid: String,
    #[serde(default)]
    pub name: String,
}

/// Acquisition as listed by the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Experiment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interval: u32,
}

/// Sample to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    pub device: String,
    /// One-based channel.
    pub channel: u32,
    pub name: String,
    pub standard_curve_name: String,
    pub metadata: BTreeMap<String, String>,
}

/// Acquisition to create over a set of samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSpec {
    pub name: String,
    pub description: String,
    /// Seconds between measurements.
    pub interval: u32,
    /// UUIDs of the samples to record.
    pub sample_uuids: Vec<String>,
}

/// Device entry of the instrument's status listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceStatus {
    #[serde(deserialize_with = "string_or_number")]
    pub label: String,
    #[serde(default)]
    pub channels: Vec<serde_json::Value>,
}

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub name: String,
}

/// Calibration curve known to the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StandardCurve {
    #[serde(default)]
    pub name: String,
}

/// Instrument-side configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct InstrumentConfig {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub standard_curves: Vec<StandardCurve>,
}

/// Devices and channel count discovered on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    pub devices: Vec<String>,
    pub channel_count: usize,
}

/// Operations the acquisition loop needs from the instrument.
pub trait ControlApi {
    /// Lists current samples.
    fn samples(&self) -> Result<Vec<Sample>, ApiError>;

    /// Lists current acquisitions.
    fn experiments(&self) -> Result<Vec<Experiment>, ApiError>;

    /// Creates samples owned by `user`.
    fn create_samples(&self, user: &str, samples: &[SampleSpec]) -> Result<(), ApiError>;

    /// Removes samples.
    fn remove_samples(&self, samples: &[Sample]) -> Result<(), ApiError>;

    /// Creates an acquisition owned by `user`.
    fn create_experiment(&self, user: &str, experiment: &ExperimentSpec) -> Result<(), ApiError>;

    fn start_experiment(&self, name: &str) -> Result<(), ApiError>;

    fn stop_experiment(&self, name: &str) -> Result<(), ApiError>;

    fn close_experiment(&self, name: &str) -> Result<(), ApiError>;
}

/// Blocking HTTP client for one instrument.
#[derive(Debug, Clone)]
pub struct HttpControlApi {
    agent: ureq::Agent,
    addr: String,
}

#[derive(Serialize)]
struct SampleRequest<'a> {
    device: &'a str,
    channel: u32,
    name: &'a str,
    metadata: &'a BTreeMap<String, String>,
    standard_curve_name: &'a str,
    user: &'a str,
}

#[derive(Serialize)]
struct SampleRef<'a> {
    device: &'a str,
    channel: u32,
}

#[derive(Serialize)]
struct UuidRef<'a> {
    uuid: &'a str,
}

#[derive(Serialize)]
struct ExperimentRequest<'a> {
    name: &'a str,
    description: &'a str,
    interval: u32,
    samples: Vec<UuidRef<'a>>,
    user: &'a str,
}

impl HttpControlApi {
    /// Creates a client for `addr` (`host[:port]`). No request is made.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            addr: addr.into(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("http://{}/api/{route}", self.addr)
    }

    fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, ApiError> {
        self.agent
            .get(&self.url(route))
            .call()?
            .into_json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn get_ok(&self, route: &str) -> Result<(), ApiError> {
        self.agent.get(&self.url(route)).call()?;
        Ok(())
    }

    /// Instrument configuration (users and standard curves).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the call fails.
    pub fn config(&self) -> Result<InstrumentConfig, ApiError> {
        self.get_json("config/")
    }

    /// Names of the instrument's standard curves.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the call fails.
    pub fn standard_curves(&self) -> Result<Vec<String>, ApiError> {
        Ok(self
            .config()?
            .standard_curves
            .into_iter()
            .map(|curve| curve.name)
            .collect())
    }

    /// Checks that `user` is registered on the instrument.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnknownUser`] if not, or the call's error.
    pub fn check_user(&self, user: &str) -> Result<(), ApiError> {
        if self.config()?.users.iter().any(|u| u.name == user) {
            Ok(())
        } else {
            Err(ApiError::UnknownUser(user.to_string()))
        }
    }

    /// Raw device status listing.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the call fails.
    pub fn device_status(&self) -> Result<Vec<DeviceStatus>, ApiError> {
        Ok(self
            .get_json::<Option<Vec<DeviceStatus>>>("device/")?
            .unwrap_or_default())
    }

    /// Device labels and channel count.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NoDevices`] for an empty listing, or the call's
    /// error.
    pub fn discover(&self) -> Result<DeviceLayout, ApiError> {
        layout_from_status(&self.device_status()?)
    }
}

/// Turns a status listing into a layout; the first device sets the channel count.
///
/// # Errors
///
/// Returns [`ApiError::NoDevices`] for an empty listing.
pub fn layout_from_status(status: &[DeviceStatus]) -> Result<DeviceLayout, ApiError> {
    let first = status.first().ok_or(ApiError::NoDevices)?;
    Ok(DeviceLayout {
        devices: status.iter().map(|device| device.label.clone()).collect(),
        channel_count: first.channels.len(),
    })
}

impl ControlApi for HttpControlApi {
    fn samples(&self) -> Result<Vec<Sample>, ApiError> {
        Ok(self
            .get_json::<Option<Vec<Sample>>>("sample/")?
            .unwrap_or_default())
    }

    fn experiments(&self) -> Result<Vec<Experiment>, ApiError> {
        // Null when nothing is listed.
        Ok(self
            .get_json::<Option<Vec<Experiment>>>("acqusition/")?
            .unwrap_or_default())
    }

    fn create_samples(&self, user: &str, samples: &[SampleSpec]) -> Result<(), ApiError> {
        let body: Vec<SampleRequest<'_>> = samples
            .iter()
            .map(|s| SampleRequest {
                device: &s.device,
                channel: s.channel,
                name: &s.name,
                metadata: &s.metadata,
                standard_curve_name: &s.standard_curve_name,
                user,
            })
            .collect();
        self.agent.post(&self.url("sample/")).send_json(body)?;
        Ok(())
    }

    fn remove_samples(&self, samples: &[Sample]) -> Result<(), ApiError> {
        let body: Vec<SampleRef<'_>> = samples
            .iter()
            .map(|s| SampleRef {
                device: &s.device,
                channel: s.channel,
            })
            .collect();
        self.agent.delete(&self.url("sample/")).send_json(body)?;
        Ok(())
    }

    fn create_experiment(&self, user: &str, experiment: &ExperimentSpec) -> Result<(), ApiError> {
        let body = ExperimentRequest {
            name: &experiment.name,
            description: &experiment.description,
            interval: experiment.interval,
            samples: experiment
                .sample_uuids
                .iter()
                .map(|uuid| UuidRef { uuid })
                .collect(),
            user,
        };
        self.agent.post(&self.url("acqusition/")).send_json(body)?;
        Ok(())
    }

    fn start_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.get_ok(&format!("acqusition/{name}/start/"))
    }

    fn stop_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.get_ok(&format!("acqusition/{name}/stop/"))
    }

    fn close_experiment(&self, name: &str) -> Result<(), ApiError> {
        self.get_ok(&format!("acqusition/{name}/close/"))
    }
}

/// Accepts a JSON string or number and yields its text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Text(text) => text,
        Label::Number(number) => number.to_string(),
    })
}
