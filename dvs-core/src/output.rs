//! Output writers for decoded event data and accumulated images.
//!
//! Supports CSV and binary event streams plus PGM snapshots of the
//! accumulated grayscale image.

use crate::types::{EventFrame, ImageSnapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// CSV writer for event frames.
///
/// One row per event, `timestamp,x,y,polarity`, with events flattened out
/// of their frames in emission order (OFF before ON within a frame).
pub struct CsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> CsvWriter<W> {
    /// Creates a new CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the geometry header line.
    pub fn write_header(&mut self, width: u32, height: u32) -> Result<(), OutputError> {
        writeln!(self.writer, "%geometry:{},{}", width, height)?;
        Ok(())
    }

    /// Writes every event of one frame.
    pub fn write_frame(&mut self, frame: &EventFrame) -> Result<(), OutputError> {
        for &(x, y) in &frame.off_events {
            writeln!(self.writer, "{},{},{},0", frame.timestamp, x, y)?;
        }
        for &(x, y) in &frame.on_events {
            writeln!(self.writer, "{},{},{},1", frame.timestamp, x, y)?;
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Binary output format for event frames.
///
/// Header: magic `DVSEVT1\0`, then width (u32), height (u32), all
/// little-endian. Each event is a packed record:
/// - timestamp: u32 (4 bytes)
/// - x: u16 (2 bytes)
/// - y: u16 (2 bytes)
/// - polarity: u8 (1 byte)
/// - padding: u8 (1 byte)
///   Total: 10 bytes per event
pub struct BinaryWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> BinaryWriter<W> {
    /// Creates a new binary writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the file header.
    pub fn write_header(&mut self, width: u32, height: u32) -> Result<(), OutputError> {
        self.writer.write_all(b"DVSEVT1\0")?;
        self.writer.write_all(&width.to_le_bytes())?;
        self.writer.write_all(&height.to_le_bytes())?;
        Ok(())
    }

    /// Writes every event of one frame.
    pub fn write_frame(&mut self, frame: &EventFrame) -> Result<(), OutputError> {
        for &(x, y) in &frame.off_events {
            self.write_record(frame.timestamp, x, y, 0)?;
        }
        for &(x, y) in &frame.on_events {
            self.write_record(frame.timestamp, x, y, 1)?;
        }
        Ok(())
    }

    #[inline]
    fn write_record(&mut self, t: u32, x: u16, y: u16, polarity: u8) -> Result<(), OutputError> {
        self.writer.write_all(&t.to_le_bytes())?;
        self.writer.write_all(&x.to_le_bytes())?;
        self.writer.write_all(&y.to_le_bytes())?;
        self.writer.write_all(&[polarity, 0])?; // polarity + padding
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes an accumulated image snapshot as a binary PGM (P5) file.
pub fn write_pgm<P: AsRef<Path>>(path: P, snapshot: &ImageSnapshot) -> Result<(), OutputError> {
    let expected = snapshot.width as usize * snapshot.height as usize;
    if snapshot.pixels.len() != expected {
        return Err(OutputError::InvalidFormat(format!(
            "snapshot has {} pixels, expected {}x{}={}",
            snapshot.pixels.len(),
            snapshot.width,
            snapshot.height,
            expected
        )));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write!(writer, "P5\n{} {}\n255\n", snapshot.width, snapshot.height)?;
    writer.write_all(&snapshot.pixels)?;
    writer.flush()?;
    Ok(())
}
