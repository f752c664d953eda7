//! Reading records produced by a data source and rows of a record file.

/// One OD measurement for a single reactor.
///
/// `channel` is zero-based; sources that count from one convert on decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// ISO-8601 timestamp, kept verbatim.
    pub timestamp: String,
    /// Device label.
    pub device: String,
    /// Zero-based channel index.
    pub channel: usize,
    /// Raw sensor intensity.
    pub intensity: f64,
    /// Blank (reference) intensity.
    pub intensity_blank: f64,
    /// OD before calibration.
    pub raw_od: f64,
    /// OD after calibration against the standard curve.
    pub converted_od: f64,
}

impl Reading {
    /// Creates a reading whose raw and converted OD are the same value.
    pub fn simple(
        timestamp: impl Into<String>,
        device: impl Into<String>,
        channel: usize,
        od: f64,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            device: device.into(),
            channel,
            intensity: 0.0,
            intensity_blank: 0.0,
            raw_od: od,
            converted_od: od,
        }
    }
}

/// Entry of a batch that could not be turned into a [`Reading`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quarantined {
    /// Position of the entry in the received batch.
    pub index: usize,
    /// Why it was rejected.
    pub reason: String,
}

/// Everything one poll cycle produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingBatch {
    /// Valid readings, in source order.
    pub readings: Vec<Reading>,
    /// Malformed entries set aside.
    pub quarantined: Vec<Quarantined>,
}

impl ReadingBatch {
    /// Batch with only valid readings.
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings,
            quarantined: Vec::new(),
        }
    }

    /// Number of valid readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when no valid reading was received.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Last valid reading of the batch.
    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }
}

/// One data row of a record file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    /// Reading as written.
    pub reading: Reading,
    /// Reactor name at write time.
    pub name: String,
    /// Live annotation at write time.
    pub annotation: String,
}
