//! Tab-separated record files.
//!
//! One row per reading, appended as it arrives:
//!
//! ```text
//! time  device  channel  name  intensity  intensity_blank  raw_od  converted_od  annotation
//! ```
//!
//! `time` is written exactly as received and `channel` is zero-based.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bloomie_core::{Reading, RecordRow, MAX_CHANNELS};
use csv::StringRecord;

use crate::error::RecordError;

/// Header row written at the top of a new file.
pub const RECORD_HEADER: &str =
    "time\tdevice\tchannel\tname\tintensity\tintensity_blank\traw_od\tconverted_od\tannotation";

const COLUMNS: usize = 9;

/// How to open the record file when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// New file with a header; fails if the file exists.
    Create,
    /// Truncate and write a fresh header.
    Overwrite,
    /// Keep existing rows and add new ones without a header.
    Append,
}

/// Append-only writer for one session.
///
/// Each row goes out in a single `write_all` of a complete line, so an
/// interrupted session leaves a file that is valid up to its last row.
/// The file is closed when the writer is dropped.
pub struct RecordWriter {
    file: File,
    path: PathBuf,
}

impl RecordWriter {
    /// Opens the record file, creating missing parent folders.
    ///
    /// In [`FileMode::Append`] a missing file is created with a header.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the folder or file cannot be created, or if
    /// the file exists in [`FileMode::Create`].
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode) -> Result<Self, RecordError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let (file, header) = match mode {
            FileMode::Create => (
                OpenOptions::new().write(true).create_new(true).open(path)?,
                true,
            ),
            FileMode::Overwrite => (File::create(path)?, true),
            FileMode::Append => {
                let existed = path.exists();
                let file = OpenOptions::new().append(true).create(true).open(path)?;
                (file, !existed)
            }
        };

        let mut writer = Self {
            file,
            path: path.to_path_buf(),
        };
        if header {
            log::info!("Creating record file {}", path.display());
            writer.file.write_all(format!("{RECORD_HEADER}\n").as_bytes())?;
        } else {
            log::info!("Appending to record file {}", path.display());
        }
        Ok(writer)
    }

    /// Writes one reading as a complete line.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn write_row(
        &mut self,
        reading: &Reading,
        name: &str,
        annotation: &str,
    ) -> std::io::Result<()> {
        let line = format_row(reading, name, annotation);
        self.file.write_all(line.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Formats a newline-terminated record row.
///
/// The timestamp is written verbatim. Tabs and line breaks inside
/// free-text fields become spaces.
pub fn format_row(reading: &Reading, name: &str, annotation: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        reading.timestamp,
        clean_field(&reading.device),
        reading.channel,
        clean_field(name),
        reading.intensity,
        reading.intensity_blank,
        reading.raw_od,
        reading.converted_od,
        clean_field(annotation),
    )
}

fn clean_field(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

/// Reads a record file back into rows.
///
/// # Errors
///
/// Returns an I/O error, or [`RecordError::Malformed`] for the first row
/// that does not parse.
pub fn read_record_file<P: AsRef<Path>>(path: P) -> Result<Vec<RecordRow>, RecordError> {
    let file = File::open(path)?;
    read_records(BufReader::new(file))
}

/// Parses record text. The header is optional and blank lines are skipped.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] with the 1-based line number.
pub fn parse_record(text: &str) -> Result<Vec<RecordRow>, RecordError> {
    read_records(text.as_bytes())
}

/// Reads rows from any tab-separated source.
///
/// Rows ending at `converted_od` (older files without annotations) are
/// accepted. Fields are taken literally; quotes carry no meaning.
///
/// # Errors
///
/// Returns an I/O error, or [`RecordError::Malformed`] for the first row
/// that does not parse.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RecordRow>, RecordError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(false)
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.iter().all(|field| field.trim().is_empty())
            || (line == 1 && record.get(0) == Some("time"))
        {
            continue;
        }
        let row = parse_row(&record).map_err(|reason| RecordError::Malformed {
            line: usize::try_from(line).unwrap_or(usize::MAX),
            reason,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn csv_error(e: csv::Error) -> RecordError {
    let line = e
        .position()
        .and_then(|p| usize::try_from(p.line()).ok())
        .unwrap_or(0);
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => RecordError::Io(io),
        _ => RecordError::Malformed { line, reason },
    }
}

fn parse_row(record: &StringRecord) -> Result<RecordRow, String> {
    if record.len() < COLUMNS - 1 || record.len() > COLUMNS {
        return Err(format!("expected {COLUMNS} columns, found {}", record.len()));
    }
    let field = |i: usize| record.get(i).unwrap_or_default();
    let number = |i: usize, column: &str| {
        field(i)
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{column} is not a number: {:?}", field(i)))
    };
    let channel = field(2)
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|channel| *channel < MAX_CHANNELS)
        .ok_or_else(|| format!("channel is not an index below {MAX_CHANNELS}: {:?}", field(2)))?;

    Ok(RecordRow {
        reading: Reading {
            timestamp: field(0).to_string(),
            device: field(1).to_string(),
            channel,
            intensity: number(4, "intensity")?,
            intensity_blank: number(5, "intensity_blank")?,
            raw_od: number(6, "raw_od")?,
            converted_od: number(7, "converted_od")?,
        },
        name: field(3).to_string(),
        annotation: field(8).to_string(),
    })
}
