//! Thread-safe FIFO handoff of raw buffers from acquisition to decode.
//!
//! Built on an unbounded crossbeam channel: enqueue is O(1) and never
//! blocks the producer, dequeue preserves arrival order, and an empty
//! queue is an explicit result rather than an error. FIFO order matters
//! because timestamp reconstruction depends on it.

use crate::types::RawBuffer;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Creates a connected producer/consumer pair.
pub fn raw_buffer_queue() -> (RawBufferSender, RawBufferReceiver) {
    let (tx, rx) = unbounded();
    (RawBufferSender { tx }, RawBufferReceiver { rx })
}

/// Result of a dequeue attempt.
#[derive(Debug)]
pub enum Dequeue {
    /// The oldest enqueued buffer.
    Buffer(RawBuffer),
    /// No buffer is currently available. Not an error.
    Empty,
    /// Every producer handle has been dropped and the queue is drained.
    /// This is the normal end-of-data signal, not an error.
    Closed,
}

/// Producer half of the queue, held by the acquisition side.
///
/// Cloneable; a single producer is the expected configuration but multiple
/// producers are tolerated.
#[derive(Debug, Clone)]
pub struct RawBufferSender {
    tx: Sender<RawBuffer>,
}

impl RawBufferSender {
    /// Appends a buffer to the queue tail. Never blocks.
    ///
    /// If the consumer has already shut down the buffer is dropped, which
    /// is acceptable for in-flight data at shutdown.
    pub fn enqueue(&self, buffer: RawBuffer) {
        if self.tx.send(buffer).is_err() {
            log::debug!("raw buffer dropped: decode consumer is gone");
        }
    }
}

/// Consumer half of the queue, owned by the decode thread.
#[derive(Debug)]
pub struct RawBufferReceiver {
    rx: Receiver<RawBuffer>,
}

impl RawBufferReceiver {
    /// Removes and returns the queue head without blocking.
    pub fn try_dequeue(&self) -> Dequeue {
        match self.rx.try_recv() {
            Ok(buffer) => Dequeue::Buffer(buffer),
            Err(TryRecvError::Empty) => Dequeue::Empty,
            Err(TryRecvError::Disconnected) => Dequeue::Closed,
        }
    }

    /// Removes and returns the queue head, waiting at most `timeout`.
    ///
    /// The bounded wait is the decode loop's cooperative yield: worst-case
    /// dequeue latency is the poll interval, with no hard spinning.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeue {
        match self.rx.recv_timeout(timeout) {
            Ok(buffer) => Dequeue::Buffer(buffer),
            Err(RecvTimeoutError::Timeout) => Dequeue::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeue::Closed,
        }
    }

    /// Number of buffers currently enqueued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when no buffers are enqueued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
