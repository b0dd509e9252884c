//! Streaming decoder and frame pipeline for DVS Gen3 event cameras.
//!
//! This crate turns the raw byte stream read from the sensor's bulk data
//! endpoint into per-pixel brightness-change events, groups events sharing
//! a timestamp into frames, and accumulates frames into a grayscale image
//! emitted at a fixed cadence.
//!
//! # Example
//!
//! ```no_run
//! use dvs_core::pipeline::{Pipeline, PipelineConfig};
//! use dvs_core::types::{wall_clock, RawBuffer};
//!
//! let (pipeline, raw_tx, outputs) = Pipeline::start(PipelineConfig::default()).unwrap();
//!
//! // Acquisition side: push captured buffers, drop the sender when done.
//! let t0 = wall_clock();
//! let bytes = read_from_device();
//! raw_tx.enqueue(RawBuffer::new(bytes, t0, wall_clock()));
//! drop(raw_tx);
//!
//! // Downstream side: frames and periodic image snapshots.
//! for frame in outputs.frames.iter() {
//!     println!("frame at t={} with {} events", frame.timestamp, frame.len());
//! }
//! let stats = pipeline.wait().unwrap();
//! println!("decoded {} events", stats.events);
//! # fn read_from_device() -> Vec<u8> { Vec::new() }
//! ```
//!
//! # Architecture
//!
//! - [`queue`]: thread-safe FIFO moving raw buffers from acquisition to
//!   the decode thread
//! - [`parser`] / [`decoder`]: bit-level packet parsing and the stateful
//!   two-level timestamp reconstruction
//! - [`frame`]: assembly of same-timestamp events into frames
//! - [`accumulator`]: lock-protected saturating-counter image
//! - [`pipeline`]: thread orchestration and cooperative shutdown
//! - [`output`]: CSV/binary event writers and PGM snapshot writer

pub mod accumulator;
pub mod decoder;
pub mod frame;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod types;

// Re-export commonly used types
pub use accumulator::{ImageAccumulator, ACCUMULATION_STEP, NEUTRAL_LEVEL};
pub use decoder::PacketDecoder;
pub use frame::{AssembleError, EventFrameAssembler};
pub use output::OutputError;
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOutputs, PipelineStats};
pub use queue::{raw_buffer_queue, Dequeue, RawBufferReceiver, RawBufferSender};
pub use types::{Event, EventFrame, ImageSnapshot, RawBuffer};
