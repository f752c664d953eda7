//! Reactor channels, the setup layout and the per-session registry.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::reading::{Reading, RecordRow};

/// Growth factor applied per tick by the simulated source.
pub const DEFAULT_GROWTH_RATE: f64 = 1.05;

/// Upper bound on channels per device, for layouts and record files alike.
pub const MAX_CHANNELS: usize = 1024;

/// Time series and label of one device × channel slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactorChannel {
    /// User-assigned label. Empty means inactive.
    pub name: String,
    times: Vec<String>,
    values: Vec<f64>,
    /// Simulation-only growth factor.
    pub growth_rate: f64,
}

impl ReactorChannel {
    /// Creates an empty channel with the given label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            times: Vec::new(),
            values: Vec::new(),
            growth_rate: DEFAULT_GROWTH_RATE,
        }
    }

    /// Appends one point. Times and values always grow together.
    pub fn push(&mut self, time: impl Into<String>, value: f64) {
        self.times.push(time.into());
        self.values.push(value);
    }

    /// Timestamps in arrival order.
    pub fn times(&self) -> &[String] {
        &self.times
    }

    /// Values, index-aligned with [`times`](Self::times).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no point has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the channel has a label.
    pub fn is_active(&self) -> bool {
        !self.name.is_empty()
    }

    /// Most recent value.
    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Device labels, channel count and the reactor name grid from the setup tab.
///
/// Names are stored `[device][channel]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorLayout {
    devices: Vec<String>,
    channel_count: usize,
    names: Vec<Vec<String>>,
}

impl ReactorLayout {
    /// Creates a layout with empty names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if there are no devices, no channels
    /// or more than [`MAX_CHANNELS`] channels.
    pub fn new(devices: Vec<String>, channel_count: usize) -> Result<Self> {
        if devices.is_empty() {
            return Err(Error::InvalidLayout("no devices".to_string()));
        }
        if channel_count == 0 {
            return Err(Error::InvalidLayout("devices report no channels".to_string()));
        }
        if channel_count > MAX_CHANNELS {
            return Err(Error::InvalidLayout(format!(
                "{channel_count} channels per device, at most {MAX_CHANNELS} supported"
            )));
        }
        let names = vec![vec![String::new(); channel_count]; devices.len()];
        Ok(Self {
            devices,
            channel_count,
            names,
        })
    }

    /// Creates a layout filled with `D{device}C{channel}` placeholders.
    ///
    /// # Errors
    ///
    /// Same as [`ReactorLayout::new`].
    pub fn with_placeholders(devices: Vec<String>, channel_count: usize) -> Result<Self> {
        let mut layout = Self::new(devices, channel_count)?;
        for (device, column) in layout.devices.iter().zip(layout.names.iter_mut()) {
            for (channel, name) in column.iter_mut().enumerate() {
                *name = format!("D{device}C{channel}");
            }
        }
        Ok(layout)
    }

    /// Device labels in discovery order.
    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Channels per device.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Reactor name at a grid cell.
    pub fn name(&self, device_index: usize, channel: usize) -> Option<&str> {
        self.names
            .get(device_index)
            .and_then(|column| column.get(channel))
            .map(String::as_str)
    }

    /// Mutable reactor name at a grid cell.
    pub fn name_mut(&mut self, device_index: usize, channel: usize) -> Option<&mut String> {
        self.names
            .get_mut(device_index)
            .and_then(|column| column.get_mut(channel))
    }

    /// Pastes a spreadsheet block starting at a cell.
    ///
    /// Lines map to channels and tab-separated fields to devices, like the
    /// setup grid. Cells falling outside the grid are dropped. Returns the
    /// number of cells written.
    pub fn paste(&mut self, text: &str, device_index: usize, channel: usize) -> usize {
        let mut written = 0;
        for (row, line) in text.lines().enumerate() {
            for (column, field) in line.split('\t').enumerate() {
                if let Some(cell) = self.name_mut(device_index + column, channel + row) {
                    *cell = field.trim().to_string();
                    written += 1;
                }
            }
        }
        written
    }

    /// Copies the block of names as tab/newline separated text.
    pub fn copy_text(&self) -> String {
        (0..self.channel_count)
            .map(|channel| {
                self.names
                    .iter()
                    .map(|column| column[channel].as_str())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Per-device reactor channels for the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    devices: IndexMap<String, Vec<ReactorChannel>>,
}

impl Registry {
    /// Builds fresh, empty series from the setup grid.
    pub fn initialize(layout: &ReactorLayout) -> Self {
        let devices = layout
            .devices()
            .iter()
            .enumerate()
            .map(|(device_index, device)| {
                let channels = (0..layout.channel_count())
                    .map(|channel| {
                        ReactorChannel::new(layout.name(device_index, channel).unwrap_or_default())
                    })
                    .collect();
                (device.clone(), channels)
            })
            .collect();
        Self { devices }
    }

    /// Rebuilds series from the rows of a record file.
    ///
    /// Devices appear in first-seen order; each device gets as many channels
    /// as its highest channel index. The last name seen for a slot wins.
    /// Rows with a channel index of [`MAX_CHANNELS`] or more are skipped.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a RecordRow>) -> Self {
        let mut devices: IndexMap<String, Vec<ReactorChannel>> = IndexMap::new();
        for row in rows {
            let reading = &row.reading;
            if reading.channel >= MAX_CHANNELS {
                log::warn!(
                    "Skipping row for device {} with channel {}",
                    reading.device,
                    reading.channel
                );
                continue;
            }
            let channels = devices.entry(reading.device.clone()).or_default();
            if channels.len() <= reading.channel {
                channels.resize_with(reading.channel + 1, || ReactorChannel::new(""));
            }
            let slot = &mut channels[reading.channel];
            slot.name.clone_from(&row.name);
            slot.push(reading.timestamp.clone(), reading.converted_od);
        }
        Self { devices }
    }

    /// Device labels in configuration order.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Label of the last configured device.
    pub fn last_device(&self) -> Option<&str> {
        self.devices.last().map(|(device, _)| device.as_str())
    }

    /// Channels of a device.
    pub fn channels(&self, device: &str) -> Option<&[ReactorChannel]> {
        self.devices.get(device).map(Vec::as_slice)
    }

    /// One reactor slot.
    pub fn channel(&self, device: &str, channel: usize) -> Option<&ReactorChannel> {
        self.devices.get(device).and_then(|channels| channels.get(channel))
    }

    /// Mutable reactor slot.
    pub fn channel_mut(&mut self, device: &str, channel: usize) -> Option<&mut ReactorChannel> {
        self.devices
            .get_mut(device)
            .and_then(|channels| channels.get_mut(channel))
    }

    /// Appends a reading's converted OD to its reactor and returns the reactor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownReactor`] if the slot is not in the registry.
    pub fn append(&mut self, reading: &Reading) -> Result<&ReactorChannel> {
        let slot = self
            .channel_mut(&reading.device, reading.channel)
            .ok_or_else(|| Error::UnknownReactor {
                device: reading.device.clone(),
                channel: reading.channel,
            })?;
        slot.push(reading.timestamp.clone(), reading.converted_od);
        Ok(&*slot)
    }

    /// All reactors with their device label and channel, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &ReactorChannel)> {
        self.devices.iter().flat_map(|(device, channels)| {
            channels
                .iter()
                .enumerate()
                .map(move |(channel, reactor)| (device.as_str(), channel, reactor))
        })
    }

    /// True when any reactor holds at least one point.
    pub fn has_data(&self) -> bool {
        self.iter().any(|(_, _, reactor)| !reactor.is_empty())
    }

    /// Total number of points across all reactors.
    pub fn point_count(&self) -> usize {
        self.iter().map(|(_, _, reactor)| reactor.len()).sum()
    }

    /// True when the registry has no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
