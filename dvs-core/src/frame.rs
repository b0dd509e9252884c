//! Assembly of decoded events into time-aligned frames.
//!
//! The sensor emits many events per timestamp tick; the assembler groups
//! consecutive events sharing a timestamp into one `EventFrame` and closes
//! the frame when the timestamp changes. Frames may span several raw
//! buffers.

use crate::types::{wall_clock, Event, EventFrame};
use thiserror::Error;

/// Maximum events per polarity list in one frame.
///
/// Sized to the device's maximum resolution; overflowing it signals a
/// capacity-planning defect rather than protocol noise, so it is the one
/// fatal error in the decode path.
pub const MAX_FRAME_EVENTS: usize = 640 * 480;

/// Errors from frame assembly.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("frame event capacity exceeded ({0} events per polarity)")]
    CapacityExceeded(usize),
}

/// Groups same-timestamp events into frames.
#[derive(Debug)]
pub struct EventFrameAssembler {
    open: bool,
    frame_timestamp: u32,
    frame_t0: f64,
    on_events: Vec<(u16, u16)>,
    off_events: Vec<(u16, u16)>,
}

impl Default for EventFrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFrameAssembler {
    /// Creates an assembler with no open frame.
    pub fn new() -> Self {
        Self {
            open: false,
            frame_timestamp: 0,
            frame_t0: 0.0,
            on_events: Vec::new(),
            off_events: Vec::new(),
        }
    }

    /// Feeds one event into the assembler.
    ///
    /// Returns the previously open frame when `event` starts a new
    /// timestamp, unless that frame was empty (idle spans produce empty
    /// frames, which are silently dropped).
    pub fn push(&mut self, event: Event) -> Result<Option<EventFrame>, AssembleError> {
        let mut emitted = None;

        if !self.open {
            self.open_frame(event.t);
        } else if event.t != self.frame_timestamp {
            emitted = self.close_frame();
            self.open_frame(event.t);
        }

        let list = if event.polarity {
            &mut self.on_events
        } else {
            &mut self.off_events
        };
        if list.len() >= MAX_FRAME_EVENTS {
            return Err(AssembleError::CapacityExceeded(MAX_FRAME_EVENTS));
        }
        list.push((event.x, event.y));

        Ok(emitted)
    }

    /// Closes and returns the open frame, if any. Used at end of stream so
    /// trailing events are not lost.
    pub fn flush(&mut self) -> Option<EventFrame> {
        if !self.open {
            return None;
        }
        self.open = false;
        self.close_frame()
    }

    /// True while a frame is accumulating events.
    pub fn has_open_frame(&self) -> bool {
        self.open
    }

    /// Timestamp of the open frame, if one is open.
    pub fn open_timestamp(&self) -> Option<u32> {
        self.open.then_some(self.frame_timestamp)
    }

    fn open_frame(&mut self, timestamp: u32) {
        self.open = true;
        self.frame_timestamp = timestamp;
        self.frame_t0 = wall_clock();
    }

    fn close_frame(&mut self) -> Option<EventFrame> {
        if self.on_events.is_empty() && self.off_events.is_empty() {
            return None;
        }
        Some(EventFrame {
            on_events: std::mem::take(&mut self.on_events),
            off_events: std::mem::take(&mut self.off_events),
            timestamp: self.frame_timestamp,
            capture_t0: self.frame_t0,
            capture_t1: wall_clock(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(x: u16, y: u16, t: u32) -> Event {
        Event::new(x, y, true, t)
    }

    fn off(x: u16, y: u16, t: u32) -> Event {
        Event::new(x, y, false, t)
    }

    #[test]
    fn test_frame_boundary_on_timestamp_change() {
        let mut asm = EventFrameAssembler::new();

        assert!(asm.push(on(1, 2, 100)).unwrap().is_none());
        assert!(asm.push(off(3, 4, 100)).unwrap().is_none());

        // A third event at a new timestamp closes the first frame.
        let frame = asm.push(on(5, 6, 101)).unwrap().expect("frame emitted");
        assert_eq!(frame.timestamp, 100);
        assert_eq!(frame.on_events, vec![(1, 2)]);
        assert_eq!(frame.off_events, vec![(3, 4)]);

        // The third event belongs to the still-open frame.
        assert!(asm.has_open_frame());
        assert_eq!(asm.open_timestamp(), Some(101));
        let open = asm.flush().expect("open frame flushed");
        assert_eq!(open.on_events, vec![(5, 6)]);
    }

    #[test]
    fn test_one_sided_frame_is_emitted() {
        let mut asm = EventFrameAssembler::new();
        asm.push(off(9, 9, 5)).unwrap();
        let frame = asm.push(off(8, 8, 6)).unwrap().expect("frame emitted");
        assert!(frame.on_events.is_empty());
        assert_eq!(frame.off_events, vec![(9, 9)]);
    }

    #[test]
    fn test_flush_returns_none_when_idle() {
        let mut asm = EventFrameAssembler::new();
        assert!(asm.flush().is_none());

        asm.push(on(0, 0, 1)).unwrap();
        assert!(asm.flush().is_some());
        assert!(asm.flush().is_none());
    }

    #[test]
    fn test_capture_times_ordered() {
        let mut asm = EventFrameAssembler::new();
        asm.push(on(0, 0, 1)).unwrap();
        let frame = asm.flush().unwrap();
        assert!(frame.capture_t1 >= frame.capture_t0);
        assert!(frame.capture_t0 > 0.0);
    }

    #[test]
    fn test_frames_span_buffers() {
        // Events from separate decode calls share a frame until the
        // timestamp changes; the assembler does not care about buffer
        // boundaries.
        let mut asm = EventFrameAssembler::new();
        asm.push(on(1, 1, 50)).unwrap();
        asm.push(on(2, 2, 50)).unwrap();
        asm.push(on(3, 3, 50)).unwrap();
        let frame = asm.push(on(4, 4, 51)).unwrap().unwrap();
        assert_eq!(frame.on_events.len(), 3);
    }
}
