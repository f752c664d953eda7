//! Reading sources for the acquisition loop.

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use bloomie_core::{Quarantined, Reading, ReadingBatch, Registry};
use chrono::{Local, SecondsFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::api::string_or_number;
use crate::error::{DataSourceError, DecodeError};

/// Blocking producer of reading batches.
pub trait DataSource {
    /// Blocks until the next batch is available.
    ///
    /// The registry is the loop's current state; sources may ignore it.
    ///
    /// # Errors
    ///
    /// Any error ends the acquisition loop.
    fn next_batch(&mut self, registry: &Registry) -> Result<ReadingBatch, DataSourceError>;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn next_batch(&mut self, registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
        (**self).next_batch(registry)
    }
}

/// Local generator of exponential growth curves.
///
/// Each tick yields one reading per device × channel. A reactor's OD is its
/// previous value times its growth rate, or a small random seed when it has
/// no point yet.
pub struct SimulatedSource {
    tick: Duration,
    rng: StdRng,
}

impl SimulatedSource {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(tick: Duration, seed: u64) -> Self {
        Self {
            tick,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn generate(&mut self, registry: &Registry) -> ReadingBatch {
        let readings = registry
            .iter()
            .map(|(device, channel, reactor)| {
                let od = match reactor.last_value() {
                    Some(previous) => previous * reactor.growth_rate,
                    None => 0.01 * self.rng.gen::<f64>(),
                };
                let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);
                Reading::simple(timestamp, device, channel, od)
            })
            .collect();
        ReadingBatch::from_readings(readings)
    }
}

impl DataSource for SimulatedSource {
    fn next_batch(&mut self, registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
        if !self.tick.is_zero() {
            thread::sleep(self.tick);
        }
        Ok(self.generate(registry))
    }
}

/// Live batches from the instrument's WebSocket.
pub struct WebSocketSource {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl WebSocketSource {
    /// Connects to `ws://<addr>/api/ws/`.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::Connection`] if the handshake fails.
    pub fn connect(addr: &str) -> Result<Self, DataSourceError> {
        let url = ws_url(addr);
        log::info!("Connecting to websocket at {url}");
        let (socket, _response) = tungstenite::connect(url.as_str())?;
        log::info!("Connected to websocket at {url}");
        Ok(Self { socket, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for WebSocketSource {
    fn next_batch(&mut self, _registry: &Registry) -> Result<ReadingBatch, DataSourceError> {
        loop {
            let text = match self.socket.read()? {
                Message::Text(text) => text,
                Message::Binary(bytes) => {
                    String::from_utf8(bytes).map_err(|_| DecodeError::NotText)?
                }
                Message::Close(frame) => {
                    log::info!("Websocket closed by peer: {frame:?}");
                    return Err(DataSourceError::Closed);
                }
                // Pongs are queued by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Ok(decode_batch(&text)?);
        }
    }
}

impl Drop for WebSocketSource {
    fn drop(&mut self) {
        if self.socket.can_write() {
            if let Err(e) = self.socket.close(None) {
                log::debug!("Websocket close: {e}");
            }
        }
    }
}

/// WebSocket URL for an instrument address.
pub fn ws_url(addr: &str) -> String {
    format!("ws://{addr}/api/ws/")
}

#[derive(Deserialize)]
struct BatchMessage {
    readings: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct WireReading {
    t: String,
    #[serde(deserialize_with = "string_or_number")]
    device: String,
    channel: u32,
    intensity: f64,
    intensity_blank: f64,
    raw_od: f64,
    converted_od: f64,
}

impl WireReading {
    fn into_reading(self) -> Result<Reading, String> {
        // One-based on the wire.
        let channel = self
            .channel
            .checked_sub(1)
            .ok_or_else(|| "channel 0 on a one-based wire".to_string())?;
        // Timestamps go to the record file verbatim, so they must stay one field.
        if self.t.contains(['\t', '\n', '\r']) {
            return Err(format!("timestamp {:?} contains a tab or line break", self.t));
        }
        Ok(Reading {
            timestamp: self.t,
            device: self.device,
            channel: channel as usize,
            intensity: self.intensity,
            intensity_blank: self.intensity_blank,
            raw_od: self.raw_od,
            converted_od: self.converted_od,
        })
    }
}

/// Decodes one `{ "readings": [...] }` message.
///
/// Entries that do not decode are quarantined with their position; only a
/// message that is not JSON or lacks `readings` is an error.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for a malformed message.
pub fn decode_batch(text: &str) -> Result<ReadingBatch, DecodeError> {
    let message: BatchMessage = serde_json::from_str(text)?;
    let mut batch = ReadingBatch::default();
    for (index, entry) in message.readings.into_iter().enumerate() {
        let decoded = serde_json::from_value::<WireReading>(entry)
            .map_err(|e| e.to_string())
            .and_then(WireReading::into_reading);
        match decoded {
            Ok(reading) => batch.readings.push(reading),
            Err(reason) => batch.quarantined.push(Quarantined { index, reason }),
        }
    }
    Ok(batch)
}
