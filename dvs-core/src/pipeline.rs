//! Pipeline orchestration: acquisition -> queue -> decode -> assemble ->
//! accumulate -> periodic emit.
//!
//! Two worker threads are spawned. The decode thread exclusively owns the
//! decoder and assembler state, so that path needs no locking; the timer
//! thread drives the accumulator's snapshot-and-reset at a fixed wall-clock
//! cadence independent of event arrival. The raw buffer queue and the
//! accumulator lock are the only synchronization points.

use crate::accumulator::ImageAccumulator;
use crate::decoder::PacketDecoder;
use crate::frame::{AssembleError, EventFrameAssembler};
use crate::queue::{raw_buffer_queue, Dequeue, RawBufferReceiver, RawBufferSender};
use crate::types::{EventFrame, ImageSnapshot};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest the timer thread sleeps before re-checking the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Errors surfaced when the pipeline is shut down.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("invalid emit frequency: {0} Hz")]
    InvalidEmitFrequency(f32),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pipeline worker thread panicked")]
    WorkerPanicked,
}

/// Load-time pipeline configuration.
///
/// Only the emit cadence, image dimensions, and decode poll interval are
/// configurable; protocol constants are fixed by the hardware.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Accumulated image width (the event y axis).
    pub width: u32,
    /// Accumulated image height (the event x axis).
    pub height: u32,
    /// Snapshot emission frequency in Hz.
    pub emit_frequency_hz: f32,
    /// How long the decode loop waits on an empty queue before re-checking
    /// the shutdown flag. Bounds worst-case decode latency.
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 320,
            emit_frequency_hz: 24.0,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Counters reported by the decode thread at shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    /// Raw buffers consumed from the queue.
    pub buffers: u64,
    /// Events decoded.
    pub events: u64,
    /// Frames emitted downstream.
    pub frames: u64,
    /// Packet ID words observed (loss-detection extension point).
    pub packet_ids: u64,
}

/// Downstream receivers for decoded data.
///
/// Frames arrive as the assembler closes them; image snapshots arrive at
/// the configured cadence regardless of event activity.
pub struct PipelineOutputs {
    pub frames: Receiver<EventFrame>,
    pub images: Receiver<ImageSnapshot>,
}

/// Handle to a running pipeline.
///
/// The producer half of the raw buffer queue is returned by
/// [`Pipeline::start`]; dropping every sender is the normal end-of-data
/// signal.
pub struct Pipeline {
    shutdown: Arc<AtomicBool>,
    decode_handle: Option<JoinHandle<Result<PipelineStats, PipelineError>>>,
    timer_handle: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Starts the decode and emit-timer threads. Returns the handle, the
    /// producer half of the raw buffer queue for the acquisition side, and
    /// the downstream receivers.
    pub fn start(
        config: PipelineConfig,
    ) -> Result<(Self, RawBufferSender, PipelineOutputs), PipelineError> {
        // Rejects zero, negative, NaN, and frequencies too low to express
        // as a Duration.
        let period = Duration::try_from_secs_f64(1.0 / config.emit_frequency_hz as f64)
            .map_err(|_| PipelineError::InvalidEmitFrequency(config.emit_frequency_hz))?;

        let (raw_tx, raw_rx) = raw_buffer_queue();
        let (frame_tx, frame_rx) = unbounded();
        let (image_tx, image_rx) = unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let accumulator = Arc::new(ImageAccumulator::new(config.width, config.height));

        let decode_handle = {
            let shutdown = Arc::clone(&shutdown);
            let accumulator = Arc::clone(&accumulator);
            let poll_interval = config.poll_interval;
            thread::Builder::new()
                .name("dvs-decode".into())
                .spawn(move || {
                    let result =
                        decode_loop(&raw_rx, &frame_tx, &accumulator, &shutdown, poll_interval);
                    // End of input (normal or fatal) also stops the timer.
                    shutdown.store(true, Ordering::Release);
                    result
                })?
        };

        let timer_handle = {
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("dvs-emit".into())
                .spawn(move || emit_loop(&accumulator, &image_tx, &shutdown, period))?
        };

        let pipeline = Self {
            shutdown,
            decode_handle: Some(decode_handle),
            timer_handle: Some(timer_handle),
        };
        let outputs = PipelineOutputs {
            frames: frame_rx,
            images: image_rx,
        };
        Ok((pipeline, raw_tx, outputs))
    }

    /// Requests cooperative shutdown and joins both worker threads.
    ///
    /// Buffers still in flight may be dropped. Returns the decode thread's
    /// statistics, or the fatal error that stopped it.
    pub fn shutdown(mut self) -> Result<PipelineStats, PipelineError> {
        self.shutdown.store(true, Ordering::Release);
        self.join()
    }

    /// Joins both worker threads without forcing shutdown; returns once
    /// the acquisition side has dropped its senders and the queue drained.
    pub fn wait(mut self) -> Result<PipelineStats, PipelineError> {
        self.join()
    }

    fn join(&mut self) -> Result<PipelineStats, PipelineError> {
        let stats = match self.decode_handle.take() {
            Some(handle) => handle.join().map_err(|_| PipelineError::WorkerPanicked)?,
            None => Ok(PipelineStats::default()),
        };
        if let Some(handle) = self.timer_handle.take() {
            if handle.join().is_err() {
                return Err(PipelineError::WorkerPanicked);
            }
        }
        stats
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.join();
    }
}

/// Decode loop: dequeue, decode, assemble, accumulate, forward.
fn decode_loop(
    raw_rx: &RawBufferReceiver,
    frame_tx: &Sender<EventFrame>,
    accumulator: &ImageAccumulator,
    shutdown: &AtomicBool,
    poll_interval: Duration,
) -> Result<PipelineStats, PipelineError> {
    let mut decoder = PacketDecoder::new();
    let mut assembler = EventFrameAssembler::new();
    let mut events = Vec::new();
    let mut stats = PipelineStats::default();

    loop {
        match raw_rx.dequeue_timeout(poll_interval) {
            Dequeue::Buffer(buffer) => {
                events.clear();
                decoder.decode_buffer(&buffer.data, &mut events);
                stats.buffers += 1;
                stats.events += events.len() as u64;

                for event in events.drain(..) {
                    if let Some(frame) = assembler.push(event)? {
                        accumulator.apply(&frame);
                        stats.frames += 1;
                        // A gone consumer is not a decode failure; keep
                        // accumulating for the image path.
                        let _ = frame_tx.send(frame);
                    }
                }
            }
            Dequeue::Empty => {
                if shutdown.load(Ordering::Acquire) {
                    log::debug!("decode loop: shutdown requested");
                    break;
                }
            }
            Dequeue::Closed => {
                log::debug!("decode loop: acquisition closed the queue");
                break;
            }
        }
    }

    if let Some(frame) = assembler.flush() {
        accumulator.apply(&frame);
        stats.frames += 1;
        let _ = frame_tx.send(frame);
    }

    stats.packet_ids = decoder.packet_id_count();
    log::debug!(
        "decode loop done: {} buffers, {} events, {} frames",
        stats.buffers,
        stats.events,
        stats.frames
    );
    Ok(stats)
}

/// Timer loop: snapshot-and-reset at a fixed cadence, decoupled from event
/// arrival.
fn emit_loop(
    accumulator: &ImageAccumulator,
    image_tx: &Sender<ImageSnapshot>,
    shutdown: &AtomicBool,
    period: Duration,
) {
    let mut next_emit = Instant::now() + period;

    while !shutdown.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next_emit {
            thread::sleep((next_emit - now).min(SHUTDOWN_POLL));
            continue;
        }

        let snapshot = accumulator.snapshot_and_reset();
        if image_tx.send(snapshot).is_err() {
            log::debug!("emit loop: snapshot consumer is gone");
            break;
        }

        next_emit += period;
        if next_emit < now {
            // Fell behind (e.g. a suspended host); skip the missed ticks
            // instead of bursting.
            next_emit = now + period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawBuffer;

    fn group_word() -> [u8; 4] {
        // grpAddr=1, one event at row 471
        [0x80, 0x04, 0x00, 0x01]
    }

    fn column_word(sub_ts: u16, raw_x: u16) -> [u8; 4] {
        [
            0x04,
            ((sub_ts >> 5) & 0x1F) as u8,
            (((sub_ts & 0x1F) << 3) | ((raw_x >> 8) & 0x03)) as u8,
            (raw_x & 0xFF) as u8,
        ]
    }

    #[test]
    fn test_end_to_end_frames_and_shutdown() {
        let (pipeline, tx, outputs) = Pipeline::start(PipelineConfig::default()).unwrap();

        // Two timestamps' worth of events in one buffer.
        let mut data = Vec::new();
        data.extend_from_slice(&column_word(1, 0));
        data.extend_from_slice(&group_word());
        data.extend_from_slice(&column_word(2, 0));
        data.extend_from_slice(&group_word());
        tx.enqueue(RawBuffer::new(data, 0.0, 0.0));
        drop(tx);

        let stats = pipeline.wait().expect("pipeline stats");
        assert_eq!(stats.buffers, 1);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.frames, 2);

        let frames: Vec<_> = outputs.frames.try_iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp, 1);
        assert_eq!(frames[1].timestamp, 2);
        assert_eq!(frames[0].off_events, vec![(319, 471)]);
    }

    #[test]
    fn test_snapshots_arrive_without_events() {
        let config = PipelineConfig {
            emit_frequency_hz: 100.0,
            ..Default::default()
        };
        let (pipeline, _tx, outputs) = Pipeline::start(config).unwrap();

        // No buffers at all: snapshots still arrive, uniformly neutral.
        let snap = outputs
            .images
            .recv_timeout(Duration::from_secs(2))
            .expect("snapshot within two seconds");
        assert!(snap.pixels.iter().all(|&v| v == 128));

        pipeline.shutdown().expect("clean shutdown");
    }

    #[test]
    fn test_rejects_unusable_emit_frequency() {
        for hz in [0.0f32, -24.0, f32::NAN] {
            let config = PipelineConfig {
                emit_frequency_hz: hz,
                ..Default::default()
            };
            assert!(matches!(
                Pipeline::start(config),
                Err(PipelineError::InvalidEmitFrequency(_))
            ));
        }
    }

    #[test]
    fn test_shutdown_with_buffers_in_flight() {
        let (pipeline, tx, _outputs) = Pipeline::start(PipelineConfig::default()).unwrap();
        for _ in 0..16 {
            tx.enqueue(RawBuffer::new(vec![0u8; 4096], 0.0, 0.0));
        }
        // In-flight buffers may be dropped; shutdown must still be clean.
        pipeline.shutdown().expect("clean shutdown");
    }
}
