//! DVS capture replay CLI.
//!
//! Replays a raw capture file through the decode pipeline, standing in for
//! the live acquisition thread: the file is read in bulk-transfer-sized
//! chunks, stamped with capture times, and enqueued for the decode thread.
//! Decoded events can be written to CSV or binary, and accumulated image
//! snapshots to numbered PGM files.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{never, select};
use dvs_core::output::{BinaryWriter, CsvWriter};
use dvs_core::pipeline::{Pipeline, PipelineConfig};
use dvs_core::types::{wall_clock, RawBuffer};
use dvs_core::{output, ImageSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Raw DVS capture replay and decoder.
///
/// Feeds a raw capture file through the full decode pipeline: packet
/// decoding, frame assembly, and periodic grayscale accumulation.
#[derive(Parser, Debug)]
#[command(name = "dvs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input raw capture file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file for decoded events (.csv or .bin)
    ///
    /// The format is determined by the file extension:
    /// - .csv: timestamp,x,y,polarity rows (human-readable)
    /// - .bin: packed little-endian records (efficient)
    #[arg(short, long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Directory for accumulated image snapshots (numbered PGM files)
    #[arg(short, long, value_name = "DIR")]
    snapshots: Option<PathBuf>,

    /// Snapshot emission frequency in Hz
    #[arg(long, default_value_t = 24.0)]
    hz: f32,

    /// Bytes per replayed buffer, mimicking the bulk transfer size
    #[arg(long, default_value_t = 1024)]
    chunk_size: usize,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Writes decoded event frames to the requested sink.
enum EventWriter {
    Csv(CsvWriter<File>),
    Binary(BinaryWriter<File>),
}

impl EventWriter {
    fn create(path: &Path, config: &PipelineConfig) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv")
            .to_lowercase();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

        match ext.as_str() {
            "csv" => {
                let mut writer = CsvWriter::new(file);
                writer.write_header(config.width, config.height)?;
                Ok(Self::Csv(writer))
            }
            "bin" => {
                let mut writer = BinaryWriter::new(file);
                writer.write_header(config.width, config.height)?;
                Ok(Self::Binary(writer))
            }
            other => anyhow::bail!("Unsupported event format: .{}. Use .csv or .bin", other),
        }
    }

    fn write_frame(&mut self, frame: &dvs_core::EventFrame) -> Result<()> {
        match self {
            Self::Csv(w) => w.write_frame(frame)?,
            Self::Binary(w) => w.write_frame(frame)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Self::Csv(w) => w.flush()?,
            Self::Binary(w) => w.flush()?,
        }
        Ok(())
    }
}

fn save_snapshot(dir: &Path, index: u64, snapshot: &ImageSnapshot) -> Result<()> {
    let path = dir.join(format!("snapshot_{:06}.pgm", index));
    output::write_pgm(&path, snapshot)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    anyhow::ensure!(args.chunk_size >= 4, "chunk size must be at least 4 bytes");
    anyhow::ensure!(args.hz > 0.0, "emission frequency must be positive");

    let config = PipelineConfig {
        emit_frequency_hz: args.hz,
        ..Default::default()
    };

    let mut event_writer = args
        .events
        .as_ref()
        .map(|path| EventWriter::create(path, &config))
        .transpose()?;

    if let Some(dir) = &args.snapshots {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        pb.set_message("Replaying...");
        pb
    };

    let start_time = Instant::now();

    let (pipeline, raw_tx, outputs) =
        Pipeline::start(config).context("Failed to start decode pipeline")?;

    // Replay the capture file as the acquisition producer. Dropping the
    // sender at end of file is the normal shutdown signal.
    let input = args.input.clone();
    let chunk_size = args.chunk_size;
    let producer = std::thread::spawn(move || -> Result<u64> {
        let mut file =
            File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
        let mut total = 0u64;
        let mut chunk = vec![0u8; chunk_size];
        loop {
            let t0 = wall_clock();
            let n = file.read(&mut chunk).context("Failed to read capture")?;
            if n == 0 {
                break;
            }
            total += n as u64;
            raw_tx.enqueue(RawBuffer::new(chunk[..n].to_vec(), t0, wall_clock()));
        }
        Ok(total)
    });

    // Drain frames and snapshots until both channels close. A closed
    // channel is swapped for `never()` so the select stops polling it.
    let mut frames = outputs.frames;
    let mut images = outputs.images;
    let mut frame_count = 0u64;
    let mut event_count = 0u64;
    let mut snapshot_count = 0u64;
    let mut frames_open = true;
    let mut images_open = true;

    while frames_open || images_open {
        select! {
            recv(frames) -> msg => match msg {
                Ok(frame) => {
                    frame_count += 1;
                    event_count += frame.len() as u64;
                    if let Some(writer) = event_writer.as_mut() {
                        writer.write_frame(&frame)?;
                    }
                    if frame_count % 1000 == 0 {
                        progress.set_message(format!(
                            "{} frames, {} events, {} snapshots",
                            frame_count, event_count, snapshot_count
                        ));
                    }
                }
                Err(_) => {
                    frames_open = false;
                    frames = never();
                }
            },
            recv(images) -> msg => match msg {
                Ok(snapshot) => {
                    if let Some(dir) = &args.snapshots {
                        save_snapshot(dir, snapshot_count, &snapshot)?;
                    }
                    snapshot_count += 1;
                }
                Err(_) => {
                    images_open = false;
                    images = never();
                }
            },
        }
    }

    let bytes_replayed = producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    let stats = pipeline.wait().context("Pipeline failed")?;

    if let Some(writer) = event_writer.as_mut() {
        writer.flush()?;
    }

    let total_duration = start_time.elapsed();

    progress.finish_with_message(format!(
        "Done! {} events in {} frames, {} snapshots in {:.2}s",
        stats.events,
        stats.frames,
        snapshot_count,
        total_duration.as_secs_f64()
    ));

    if !args.quiet {
        let events_per_sec = stats.events as f64 / total_duration.as_secs_f64();
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {}", args.input.display());
        eprintln!("  Bytes:        {}", bytes_replayed);
        eprintln!("  Buffers:      {}", stats.buffers);
        eprintln!("  Events:       {}", stats.events);
        eprintln!("  Frames:       {}", stats.frames);
        eprintln!("  Snapshots:    {}", snapshot_count);
        eprintln!("  Packet IDs:   {}", stats.packet_ids);
        eprintln!("  Duration:     {:.3}s", total_duration.as_secs_f64());
        eprintln!("  Throughput:   {:.0} events/s", events_per_sec);
    }

    Ok(())
}
