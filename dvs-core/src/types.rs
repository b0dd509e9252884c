//! Core types for decoded DVS event data.
//!
//! This module defines the raw buffer, event, frame, and image types that
//! flow through the decode pipeline.

use std::time::{SystemTime, UNIX_EPOCH};

/// Sensor columns addressable by the column-address packet (x = 0..=319).
pub const SENSOR_X_EXTENT: u16 = 320;

/// Sensor rows addressable by group packets (y = 0..=479).
pub const SENSOR_Y_EXTENT: u16 = 480;

/// A raw byte buffer as captured from the sensor's bulk endpoint.
///
/// Capture timestamps bracket the bulk read that produced the buffer and
/// are wall-clock seconds, used downstream for latency measurement. The
/// buffer is owned by the queue while enqueued and moves to the decode
/// thread on dequeue.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    /// Raw protocol bytes, in arrival order.
    pub data: Vec<u8>,
    /// Wall-clock time just before the read started.
    pub t0: f64,
    /// Wall-clock time just after the read completed.
    pub t1: f64,
}

impl RawBuffer {
    /// Creates a raw buffer with the given capture timestamps.
    pub fn new(data: Vec<u8>, t0: f64, t1: f64) -> Self {
        Self { data, t0, t1 }
    }
}

/// A decoded brightness-change event.
///
/// Each event carries the pixel coordinates, polarity (`true` = brightness
/// increase, `false` = decrease), and a timestamp in microseconds
/// reconstructed from the two-level protocol timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// X coordinate of the pixel (0-319)
    pub x: u16,
    /// Y coordinate of the pixel (0-479)
    pub y: u16,
    /// Event polarity: true = ON (increase), false = OFF (decrease)
    pub polarity: bool,
    /// Timestamp in microseconds
    pub t: u32,
}

impl Event {
    /// Creates a new event.
    #[inline]
    pub fn new(x: u16, y: u16, polarity: bool, t: u32) -> Self {
        Self { x, y, polarity, t }
    }
}

/// A batch of events sharing a single sensor timestamp.
///
/// Frames are built incrementally by the assembler, possibly across several
/// raw buffers, and emitted when the sensor timestamp changes. `capture_t0`
/// is the wall-clock time the frame was opened and `capture_t1` the time it
/// was emitted, so consumers can measure pipeline latency.
#[derive(Debug, Clone, Default)]
pub struct EventFrame {
    /// (x, y) coordinates of ON events in this frame.
    pub on_events: Vec<(u16, u16)>,
    /// (x, y) coordinates of OFF events in this frame.
    pub off_events: Vec<(u16, u16)>,
    /// Sensor timestamp shared by every event in the frame, in microseconds.
    pub timestamp: u32,
    /// Wall-clock time the frame was opened.
    pub capture_t0: f64,
    /// Wall-clock time the frame was emitted.
    pub capture_t1: f64,
}

impl EventFrame {
    /// Total number of events (both polarities) in the frame.
    pub fn len(&self) -> usize {
        self.on_events.len() + self.off_events.len()
    }

    /// True when the frame holds no events of either polarity.
    pub fn is_empty(&self) -> bool {
        self.on_events.is_empty() && self.off_events.is_empty()
    }
}

/// A snapshot of the accumulated grayscale image.
///
/// Row-major, `height` rows of `width` columns, 8-bit saturating counters
/// centered on 128. The sensor is mounted rotated, so an event's `x`
/// selects the row and its `y` the column.
#[derive(Debug, Clone)]
pub struct ImageSnapshot {
    /// Image width in pixels (the event y axis).
    pub width: u32,
    /// Image height in pixels (the event x axis).
    pub height: u32,
    /// Row-major pixel data, `width * height` bytes.
    pub pixels: Vec<u8>,
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn wall_clock() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(100, 200, true, 12345);
        assert_eq!(event.x, 100);
        assert_eq!(event.y, 200);
        assert!(event.polarity);
        assert_eq!(event.t, 12345);
    }

    #[test]
    fn test_frame_emptiness() {
        let mut frame = EventFrame::default();
        assert!(frame.is_empty());

        frame.off_events.push((3, 7));
        assert!(!frame.is_empty());
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_wall_clock_progresses() {
        let a = wall_clock();
        let b = wall_clock();
        assert!(b >= a);
        assert!(a > 0.0);
    }
}
